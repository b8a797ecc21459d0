//! Business reference generation.

use uuid::Uuid;

/// Reference prefix for normal cash deposits
pub const DEPOSIT: &str = "DEP";
/// Reference prefix for momokash collections
pub const MOMOKASH: &str = "MMK";
/// Reference prefix for loan repayments
pub const LOAN_REPAYMENT: &str = "LRP";
/// Reference prefix for loan processing fees
pub const LOAN_FEE: &str = "LPF";
/// Reference prefix for till openings and provisionings
pub const OPENING: &str = "OOD";
/// Reference prefix for till closings
pub const CLOSING: &str = "COD";

/// Generates a new reference of the form `PREFIX-XXXXXXXXXXXX`.
#[must_use]
pub fn new_reference(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{prefix}-{}", &id[..12])
}
