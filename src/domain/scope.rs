//! Authorized data scope of a request.

use super::ids::{CarId, CompanyId};

/// Companies (and optionally one car) a request may read.
///
/// Produced only by the scope resolver after ownership checks; an empty
/// company list is valid and yields zero-valued reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    /// Owned companies in scope, ascending.
    pub company_ids: Vec<CompanyId>,
    /// Single car the request is narrowed to.
    pub car_id: Option<CarId>,
}

impl Scope {
    /// Whether no company is in scope.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.company_ids.is_empty()
    }

    /// Whether `company` is in scope.
    #[must_use]
    pub fn includes_company(&self, company: CompanyId) -> bool {
        self.company_ids.contains(&company)
    }

    /// Raw company keys, for binding into SQL.
    #[must_use]
    pub fn company_keys(&self) -> Vec<i64> {
        self.company_ids.iter().map(|c| c.get()).collect()
    }
}
