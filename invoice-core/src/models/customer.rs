use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    // Postal address
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,

    pub homepage: String,
    /// VAT identification number.
    pub uid: String,
    pub salutation: String,
    pub title: String,
    pub phone_number: String,
    pub mobile_number: String,
}

/// For creating new customers (no id)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,
    pub homepage: String,
    pub uid: String,
    pub salutation: String,
    pub title: String,
    pub phone_number: String,
    pub mobile_number: String,
}

impl Customer {
    /// Name shown in customer pickers: the company name, or the person's
    /// name for private customers.
    pub fn display_name(&self) -> String {
        if self.company_name.trim().is_empty() {
            format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string()
        } else {
            self.company_name.clone()
        }
    }

    pub fn from_new(
        id: i64,
        new: NewCustomer,
    ) -> Self {
        Self {
            id,
            company_name: new.company_name,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            address: new.address,
            city: new.city,
            country: new.country,
            zip: new.zip,
            homepage: new.homepage,
            uid: new.uid,
            salutation: new.salutation,
            title: new.title,
            phone_number: new.phone_number,
            mobile_number: new.mobile_number,
        }
    }
}
