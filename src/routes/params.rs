use serde::Deserialize;
use utoipa::IntoParams;

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl Pagination {
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, 100) as u64
    }

    pub fn zero_based_page(&self) -> u64 {
        (self.page.max(1) - 1) as u64
    }
}

/// Storefront order history is keyed by customer email.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderHistoryQuery {
    pub email: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl OrderHistoryQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminOrderListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    /// Matches order number or customer email.
    pub q: Option<String>,
}

impl AdminOrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub q: Option<String>,
}

impl ProductListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p = Pagination {
            page: 0,
            per_page: 1000,
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.zero_based_page(), 0);

        let p = Pagination {
            page: 3,
            per_page: 25,
        };
        assert_eq!(p.limit(), 25);
        assert_eq!(p.zero_based_page(), 2);
    }
}
