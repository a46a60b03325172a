pub mod breakdown;

pub use breakdown::{BreakdownError, MAX_AMOUNT, PROFESSIONAL_TAX, SalaryBreakdown, compute_breakdown};
