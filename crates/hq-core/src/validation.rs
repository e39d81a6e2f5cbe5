//! # Validation Module
//!
//! Input validation for every create and update operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (React forms)                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - called by hq-db before any round-trip          │
//! │  ├── required fields, lengths, formats                                 │
//! │  └── role ↔ subsidiary assignment                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database                                                      │
//! │  ├── UNIQUE (tax_id, username)                                         │
//! │  └── CHECK (quantity >= 0), foreign keys                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{
    InventoryUpdate, NewActivity, NewInventoryItem, NewSale, NewSubsidiary, NewUser, Role,
    SubsidiaryUpdate, UserUpdate,
};
use crate::{MAX_PRICE_CENTS, MAX_QUANTITY, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_USERNAME_LEN: usize = 64;
const MAX_TAX_ID_LEN: usize = 64;

// =============================================================================
// Field Validators
// =============================================================================

/// Fails with `Required` when the trimmed value is empty.
pub fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// Only the shape is checked: a non-empty local part and a domain
/// containing a dot.
///
/// ```rust
/// use hq_core::validation::validate_email;
///
/// assert!(validate_email("ops@acme.example").is_ok());
/// assert!(validate_email("acme.example").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    require("email", email)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Validates a password's length.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Validates a username: non-empty, bounded, no whitespace.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    require("username", username)?;
    max_len("username", username, MAX_USERNAME_LEN)?;
    if username.trim().chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn at_most(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    if value > max {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn quantity(field: &str, value: i64) -> ValidationResult<()> {
    non_negative(field, value)?;
    at_most(field, value, MAX_QUANTITY)
}

fn price(field: &str, value: i64) -> ValidationResult<()> {
    non_negative(field, value)?;
    at_most(field, value, MAX_PRICE_CENTS)
}

/// Checks that a role and a subsidiary assignment agree.
///
/// ```rust
/// use hq_core::validation::validate_role_assignment;
/// use hq_core::Role;
///
/// assert!(validate_role_assignment(Role::Staff, Some(3)).is_ok());
/// assert!(validate_role_assignment(Role::Staff, None).is_err());
/// assert!(validate_role_assignment(Role::MhcAdmin, Some(3)).is_err());
/// ```
pub fn validate_role_assignment(role: Role, subsidiary_id: Option<i64>) -> ValidationResult<()> {
    match (role.requires_subsidiary(), subsidiary_id) {
        (true, None) => Err(ValidationError::RoleAssignment {
            role: role.to_string(),
            reason: "requires a subsidiary".to_string(),
        }),
        (false, Some(_)) => Err(ValidationError::RoleAssignment {
            role: role.to_string(),
            reason: "cannot belong to a subsidiary".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a new subsidiary.
///
/// ## Rules
/// - `name`, `taxId`, `email`, `phoneNumber` are required
/// - `email` must look like an address
pub fn validate_new_subsidiary(input: &NewSubsidiary) -> ValidationResult<()> {
    require("name", &input.name)?;
    require("taxId", &input.tax_id)?;
    require("email", &input.email)?;
    require("phoneNumber", &input.phone_number)?;

    max_len("name", &input.name, MAX_NAME_LEN)?;
    max_len("taxId", &input.tax_id, MAX_TAX_ID_LEN)?;
    validate_email(&input.email)
}

/// Validates subsidiary changes. Required fields may change but not become empty.
pub fn validate_subsidiary_update(update: &SubsidiaryUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        require("name", name)?;
        max_len("name", name, MAX_NAME_LEN)?;
    }
    if let Some(tax_id) = &update.tax_id {
        require("taxId", tax_id)?;
        max_len("taxId", tax_id, MAX_TAX_ID_LEN)?;
    }
    if let Some(email) = &update.email {
        validate_email(email)?;
    }
    if let Some(phone) = &update.phone_number {
        require("phoneNumber", phone)?;
    }
    Ok(())
}

/// Validates a new user.
pub fn validate_new_user(input: &NewUser) -> ValidationResult<()> {
    validate_username(&input.username)?;
    validate_password(&input.password)?;
    validate_role_assignment(input.role, input.subsidiary_id)
}

/// Validates user changes.
pub fn validate_user_update(update: &UserUpdate) -> ValidationResult<()> {
    if let Some(username) = &update.username {
        validate_username(username)?;
    }
    if let Some(password) = &update.password {
        validate_password(password)?;
    }
    Ok(())
}

/// Validates a new inventory item.
pub fn validate_new_inventory_item(input: &NewInventoryItem) -> ValidationResult<()> {
    require("name", &input.name)?;
    max_len("name", &input.name, MAX_NAME_LEN)?;
    quantity("quantity", input.quantity)?;
    price("costPrice", input.cost_price_cents)?;
    price("salePrice", input.sale_price_cents)
}

/// Validates inventory item changes.
pub fn validate_inventory_update(update: &InventoryUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        require("name", name)?;
        max_len("name", name, MAX_NAME_LEN)?;
    }
    if let Some(value) = update.quantity {
        quantity("quantity", value)?;
    }
    if let Some(cost) = update.cost_price_cents {
        price("costPrice", cost)?;
    }
    if let Some(sale_price) = update.sale_price_cents {
        price("salePrice", sale_price)?;
    }
    Ok(())
}

/// Validates a sale request.
///
/// ## Rules
/// - quantity must be positive and at most [`MAX_QUANTITY`]
/// - an explicit sale price must be within `0..=MAX_PRICE_CENTS`
pub fn validate_new_sale(input: &NewSale) -> ValidationResult<()> {
    if input.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    at_most("quantity", input.quantity, MAX_QUANTITY)?;
    if let Some(sale_price) = input.sale_price_cents {
        price("salePrice", sale_price)?;
    }
    Ok(())
}

/// Validates an activity record.
pub fn validate_new_activity(input: &NewActivity) -> ValidationResult<()> {
    require("action", &input.action)
}

// =============================================================================
// Unit Tests
// =============================================================================
