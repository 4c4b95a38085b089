//! Supplier models

use serde::{Deserialize, Serialize};

/// Contact details captured for a supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SupplierContact {
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl SupplierContact {
    /// Blank strings from the form mean "not provided"
    pub fn normalized(self) -> Self {
        Self {
            contact_person: non_blank(self.contact_person),
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            address: non_blank(self.address),
        }
    }
}

/// Collapse empty or whitespace-only strings to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
