//! The `Customer` entity, owned exclusively by the global `public` schema.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a customer (tenant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerStatus {
    Trial,
    Active,
    Suspended,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "TRIAL",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl std::str::FromStr for CustomerStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRIAL" => Ok(Self::Trial),
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            other => Err(format!("unknown customer status: {other}")),
        }
    }
}

/// A customer (tenant) row, living exclusively in the `public` schema.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub tenant_schema: String,
    pub status: String,
    pub max_users: i32,
    pub max_certificates_per_month: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Customer {
    pub fn status(&self) -> CustomerStatus {
        self.status.parse().unwrap_or(CustomerStatus::Suspended)
    }

    pub fn is_active(&self) -> bool {
        self.status() == CustomerStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [CustomerStatus::Trial, CustomerStatus::Active, CustomerStatus::Suspended] {
            let parsed: CustomerStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }
}
