//! Tenant scope resolution and currency lookup.

use std::sync::Arc;

use crate::domain::{CarId, CompanyId, Scope, TenantId};
use crate::error::AnalyticsError;
use crate::persistence::AnalyticsStore;

/// Turns a tenant plus optional company/car narrowing into an authorized
/// [`Scope`].
///
/// Used by every report entry point before any aggregate is read.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    store: Arc<dyn AnalyticsStore>,
}

impl ScopeResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    /// Resolves the companies (and car) `tenant` may read.
    ///
    /// Without a requested company the scope is every owned company, which
    /// may be none at all.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] when the requested company is
    /// not owned by `tenant`, or the requested car does not exist or belongs
    /// to a company outside the scope. Storage failures propagate.
    pub async fn resolve(
        &self,
        tenant: TenantId,
        company: Option<CompanyId>,
        car: Option<CarId>,
    ) -> Result<Scope, AnalyticsError> {
        let owned = self.store.owned_company_ids(tenant).await?;

        let company_ids = match company {
            Some(requested) if owned.contains(&requested) => vec![requested],
            Some(requested) => {
                tracing::info!(%tenant, company = %requested, "company outside tenant scope");
                return Err(AnalyticsError::company_not_allowed());
            }
            None => owned,
        };

        if let Some(car) = car {
            let car_company = self.store.car_company(car).await?;
            if !car_company.is_some_and(|c| company_ids.contains(&c)) {
                tracing::info!(%tenant, %car, "car outside tenant scope");
                return Err(AnalyticsError::car_not_allowed());
            }
        }

        Ok(Scope {
            company_ids,
            car_id: car,
        })
    }

    /// Currency to report money in: the explicit override, else the first
    /// configured currency among the scoped companies, else `fallback`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn currency(
        &self,
        scope: &Scope,
        requested: Option<&str>,
        fallback: &str,
    ) -> Result<String, AnalyticsError> {
        if let Some(code) = requested {
            return Ok(code.to_string());
        }
        if scope.is_empty() {
            return Ok(fallback.to_string());
        }
        let configured = self.store.scope_currency(&scope.company_ids).await?;
        Ok(configured
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| fallback.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::records::{Car, Company};
    use crate::persistence::MemoryStore;

    fn company(id: i64, owner: i64, currency: Option<&str>) -> Company {
        Company {
            id: CompanyId::new(id),
            owner: TenantId::new(owner),
            name: format!("Company {id}"),
            currency: currency.map(str::to_string),
        }
    }

    fn car(id: i64, company: i64) -> Car {
        Car {
            id: CarId::new(id),
            company_id: CompanyId::new(company),
            plate_number: format!("ABC {id}"),
            brand: "Toyota".to_string(),
            model: "Vios".to_string(),
            availability_status: "available".to_string(),
            vehicle_class: Some("Sedan".to_string()),
        }
    }

    fn resolver() -> ScopeResolver {
        let store = MemoryStore::new()
            .with_company(company(2, 1, None))
            .with_company(company(1, 1, Some("usd")))
            .with_company(company(3, 9, Some("EUR")))
            .with_car(car(10, 1))
            .with_car(car(30, 3));
        ScopeResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn no_company_means_every_owned_company() {
        let Ok(scope) = resolver().resolve(TenantId::new(1), None, None).await else {
            panic!("resolve failed");
        };
        assert_eq!(scope.company_ids, vec![CompanyId::new(1), CompanyId::new(2)]);
    }

    #[tokio::test]
    async fn tenant_without_companies_gets_empty_scope() {
        let Ok(scope) = resolver().resolve(TenantId::new(5), None, None).await else {
            panic!("resolve failed");
        };
        assert!(scope.is_empty());
    }

    #[tokio::test]
    async fn foreign_company_is_forbidden() {
        let result = resolver()
            .resolve(TenantId::new(1), Some(CompanyId::new(3)), None)
            .await;
        let Err(AnalyticsError::Forbidden(message)) = result else {
            panic!("expected forbidden");
        };
        assert_eq!(message, "not allowed to access the requested company");
    }

    #[tokio::test]
    async fn car_must_belong_to_scope() {
        let r = resolver();
        let ok = r.resolve(TenantId::new(1), None, Some(CarId::new(10))).await;
        assert!(ok.is_ok());
        let foreign = r.resolve(TenantId::new(1), None, Some(CarId::new(30))).await;
        assert!(matches!(foreign, Err(AnalyticsError::Forbidden(_))));
        let unknown = r.resolve(TenantId::new(1), None, Some(CarId::new(99))).await;
        assert!(matches!(unknown, Err(AnalyticsError::Forbidden(_))));
        let other_company = r
            .resolve(TenantId::new(1), Some(CompanyId::new(2)), Some(CarId::new(10)))
            .await;
        assert!(matches!(other_company, Err(AnalyticsError::Forbidden(_))));
    }

    #[tokio::test]
    async fn currency_precedence() {
        let r = resolver();
        let Ok(scope) = r.resolve(TenantId::new(1), None, None).await else {
            panic!("resolve failed");
        };
        let explicit = r.currency(&scope, Some("JPY"), "PHP").await;
        assert_eq!(explicit.ok().as_deref(), Some("JPY"));
        let configured = r.currency(&scope, None, "PHP").await;
        assert_eq!(configured.ok().as_deref(), Some("USD"));
        let fallback = r.currency(&Scope::default(), None, "PHP").await;
        assert_eq!(fallback.ok().as_deref(), Some("PHP"));
    }
}
