//! Monthly salary breakdown derived from an annual CTC figure.
//!
//! Every component is rounded to a whole amount with banker's rounding, in a
//! fixed order. The special allowance is the residual, so the gross always
//! reconciles exactly with the monthly total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::AppError;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const BASIC_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 1); // 0.5
const HRA_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 1); // 0.5 of basic
const CONVEYANCE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05
const MEDICAL_RATE: Decimal = Decimal::from_parts(14, 0, 0, false, 3); // 0.014
const TELEPHONE_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2); // 0.02

/// Flat monthly professional tax.
pub const PROFESSIONAL_TAX: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Largest amount accepted anywhere money is entered: 999,999,999,999.
/// Stored money columns are `DECIMAL(14, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 0);

#[derive(Debug, Error, PartialEq)]
pub enum BreakdownError {
    #[error("CTC must not be negative, got {0}")]
    NegativeCtc(Decimal),

    #[error("monthly increment must not be negative, got {0}")]
    NegativeIncrement(Decimal),

    #[error("{field} {value} exceeds the maximum of {max}", max = MAX_AMOUNT)]
    TooLarge { field: &'static str, value: Decimal },
}

impl From<BreakdownError> for AppError {
    fn from(err: BreakdownError) -> Self {
        match err {
            BreakdownError::NegativeCtc(_) => AppError::invalid("ctc", err.to_string()),
            BreakdownError::NegativeIncrement(_) => {
                AppError::invalid("increment_per_month", err.to_string())
            }
            BreakdownError::TooLarge { field, .. } => AppError::invalid(field, err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalaryBreakdown {
    #[schema(value_type = String, example = "50000")]
    pub monthly_ctc: Decimal,
    #[schema(value_type = String, example = "0")]
    pub increment_per_month: Decimal,
    /// Monthly CTC after the increment is applied.
    #[schema(value_type = String, example = "50000")]
    pub monthly_total: Decimal,
    #[schema(value_type = String, example = "25000")]
    pub basic: Decimal,
    #[schema(value_type = String, example = "12500")]
    pub hra: Decimal,
    #[schema(value_type = String, example = "2500")]
    pub conveyance: Decimal,
    #[schema(value_type = String, example = "700")]
    pub medical: Decimal,
    #[schema(value_type = String, example = "1000")]
    pub telephone: Decimal,
    #[schema(value_type = String, example = "8300")]
    pub special_allowance: Decimal,
    #[schema(value_type = String, example = "200")]
    pub professional_tax: Decimal,
    #[schema(value_type = String, example = "50000")]
    pub gross_salary: Decimal,
    #[schema(value_type = String, example = "49800")]
    pub net_salary: Decimal,
}

fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Splits an annual CTC plus a monthly increment into pay components.
///
/// The special allowance is not clamped: for very small totals the rounded
/// components can exceed the monthly total and the allowance goes negative.
pub fn compute_breakdown(
    ctc: Decimal,
    monthly_increment: Decimal,
) -> Result<SalaryBreakdown, BreakdownError> {
    if ctc.is_sign_negative() && !ctc.is_zero() {
        return Err(BreakdownError::NegativeCtc(ctc));
    }
    if monthly_increment.is_sign_negative() && !monthly_increment.is_zero() {
        return Err(BreakdownError::NegativeIncrement(monthly_increment));
    }
    if ctc > MAX_AMOUNT {
        return Err(BreakdownError::TooLarge { field: "ctc", value: ctc });
    }
    if monthly_increment > MAX_AMOUNT {
        return Err(BreakdownError::TooLarge {
            field: "increment_per_month",
            value: monthly_increment,
        });
    }

    let monthly_ctc = round_whole(ctc / MONTHS_PER_YEAR);
    let monthly_total = monthly_ctc + monthly_increment;

    let basic = round_whole(monthly_total * BASIC_RATE);
    let hra = round_whole(basic * HRA_RATE);
    let conveyance = round_whole(monthly_total * CONVEYANCE_RATE);
    let medical = round_whole(monthly_total * MEDICAL_RATE);
    let telephone = round_whole(monthly_total * TELEPHONE_RATE);

    let special_allowance = monthly_total - (basic + hra + conveyance + medical + telephone);
    if special_allowance.is_sign_negative() && !special_allowance.is_zero() {
        tracing::debug!(%monthly_total, %special_allowance, "special allowance is negative");
    }

    let gross_salary = basic + hra + conveyance + medical + telephone + special_allowance;
    let net_salary = gross_salary - PROFESSIONAL_TAX;

    Ok(SalaryBreakdown {
        monthly_ctc: monthly_ctc.normalize(),
        increment_per_month: monthly_increment.normalize(),
        monthly_total: monthly_total.normalize(),
        basic: basic.normalize(),
        hra: hra.normalize(),
        conveyance: conveyance.normalize(),
        medical: medical.normalize(),
        telephone: telephone.normalize(),
        special_allowance: special_allowance.normalize(),
        professional_tax: PROFESSIONAL_TAX,
        gross_salary: gross_salary.normalize(),
        net_salary: net_salary.normalize(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn six_lakh_ctc_without_increment() {
        let b = compute_breakdown(dec!(600000), dec!(0)).unwrap();

        assert_eq!(b.monthly_ctc, dec!(50000));
        assert_eq!(b.basic, dec!(25000));
        assert_eq!(b.hra, dec!(12500));
        assert_eq!(b.conveyance, dec!(2500));
        assert_eq!(b.medical, dec!(700));
        assert_eq!(b.telephone, dec!(1000));
        assert_eq!(b.special_allowance, dec!(8300));
        assert_eq!(b.professional_tax, dec!(200));
        assert_eq!(b.gross_salary, dec!(50000));
        assert_eq!(b.net_salary, dec!(49800));
    }

    #[test]
    fn increment_is_added_before_percentages() {
        let b = compute_breakdown(dec!(600000), dec!(5000)).unwrap();

        assert_eq!(b.monthly_total, dec!(55000));
        assert_eq!(b.basic, dec!(27500));
        assert_eq!(b.hra, dec!(13750));
        assert_eq!(b.conveyance, dec!(2750));
        assert_eq!(b.medical, dec!(770));
        assert_eq!(b.telephone, dec!(1100));
        assert_eq!(b.special_allowance, dec!(9130));
        assert_eq!(b.net_salary, dec!(54800));
    }

    #[test]
    fn monthly_ctc_uses_bankers_rounding() {
        // 30 / 12 = 2.5 rounds to the even neighbour
        assert_eq!(compute_breakdown(dec!(30), dec!(0)).unwrap().monthly_ctc, dec!(2));
        // 42 / 12 = 3.5
        assert_eq!(compute_breakdown(dec!(42), dec!(0)).unwrap().monthly_ctc, dec!(4));
    }

    #[test]
    fn gross_reconciles_with_monthly_total() {
        let ctcs = [
            dec!(0),
            dec!(1),
            dec!(99),
            dec!(100000),
            dec!(123457),
            dec!(250001),
            dec!(999999.99),
            dec!(4800000),
        ];
        let increments = [dec!(0), dec!(1), dec!(333), dec!(1250.5)];

        for ctc in ctcs {
            for inc in increments {
                let b = compute_breakdown(ctc, inc).unwrap();
                let components =
                    b.basic + b.hra + b.conveyance + b.medical + b.telephone + b.special_allowance;
                let expected = round_whole(ctc / dec!(12)) + inc;

                assert_eq!(components, expected, "ctc={ctc} inc={inc}");
                assert_eq!(b.gross_salary, expected, "ctc={ctc} inc={inc}");
                assert_eq!(b.net_salary, b.gross_salary - dec!(200), "ctc={ctc} inc={inc}");
            }
        }
    }

    #[test]
    fn zero_ctc_leaves_negative_net() {
        let b = compute_breakdown(dec!(0), dec!(0)).unwrap();

        assert_eq!(b.gross_salary, dec!(0));
        assert_eq!(b.net_salary, dec!(-200));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert_eq!(
            compute_breakdown(dec!(-1), dec!(0)),
            Err(BreakdownError::NegativeCtc(dec!(-1)))
        );
        assert_eq!(
            compute_breakdown(dec!(1000), dec!(-5)),
            Err(BreakdownError::NegativeIncrement(dec!(-5)))
        );
    }

    #[test]
    fn max_amount_is_the_largest_column_value() {
        assert_eq!(MAX_AMOUNT, dec!(999999999999));
    }

    #[test]
    fn amounts_beyond_the_maximum_are_rejected() {
        let huge = dec!(79228162514264337593543950335);
        assert_eq!(
            compute_breakdown(huge, dec!(0)),
            Err(BreakdownError::TooLarge { field: "ctc", value: huge })
        );
        assert!(matches!(
            compute_breakdown(dec!(600000), huge),
            Err(BreakdownError::TooLarge { field: "increment_per_month", .. })
        ));

        let err: AppError = compute_breakdown(huge, huge).unwrap_err().into();
        assert!(matches!(err, AppError::InvalidInput { field: "ctc", .. }));

        // the largest accepted inputs still compute
        let b = compute_breakdown(MAX_AMOUNT, MAX_AMOUNT).unwrap();
        assert_eq!(b.gross_salary, b.monthly_total);
    }

    #[test]
    fn negative_input_maps_to_invalid_input() {
        let err: AppError = compute_breakdown(dec!(-10), dec!(0)).unwrap_err().into();
        assert!(matches!(err, AppError::InvalidInput { field: "ctc", .. }));
    }
}
