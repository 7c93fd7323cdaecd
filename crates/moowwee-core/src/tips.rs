//! # Tips Calculator
//!
//! Derives a gratuity from a job's settled price and splits it across the
//! crew.
//!
//! ```text
//!   TipInput::Percentage(15%) ──┐                  ┌─► tips_amount     $30.00
//!                               ├─► price $200 ────┤   tips_percentage 15.00%
//!   TipInput::Amount($30)    ───┘                  └─► shares ÷ crew
//!                                                       [$10.00, $10.00, $10.00]
//! ```
//!
//! ## Remainder Rule
//! Shares are `amount / crew` cents each; leftover cents go to crew member 1
//! (see [`Money::split_evenly`]). Shares always sum to exactly the amount.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CrewShare, Job, Percentage, TipsDistribution};

/// Highest accepted gratuity, as a share of the price.
const MAX_TIP_BPS: u32 = 10_000;

/// The gratuity as entered: exactly one of amount or percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipInput {
    Amount(Money),
    Percentage(Percentage),
}

impl TipInput {
    /// Builds the input from two optional form fields.
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::{Money, TipInput};
    ///
    /// assert!(TipInput::from_fields(Some(Money::from_dollars(20)), None).is_ok());
    /// assert!(TipInput::from_fields(None, None).is_err());
    /// ```
    pub fn from_fields(
        amount: Option<Money>,
        percentage: Option<Percentage>,
    ) -> Result<TipInput, ValidationError> {
        match (amount, percentage) {
            (Some(amount), None) => Ok(TipInput::Amount(amount)),
            (None, Some(percentage)) => Ok(TipInput::Percentage(percentage)),
            _ => Err(ValidationError::ExactlyOneOf {
                fields: vec!["tips_amount".to_string(), "tips_percentage".to_string()],
            }),
        }
    }
}

/// Computes a gratuity for a job and splits it across `crew_size` members.
///
/// Rejects a job without a quoted price, a non-positive price, a zero crew,
/// a negative amount and anything above 100% of the price.
pub fn calculate(job: &Job, input: TipInput, crew_size: u32) -> CoreResult<TipsDistribution> {
    let price = job.price.ok_or_else(|| CoreError::PriceNotQuoted {
        job: job.request_number.clone(),
    })?;

    distribute(price, input, crew_size).map_err(CoreError::from)
}

/// Price-level calculation behind [`calculate`].
pub fn distribute(
    price: Money,
    input: TipInput,
    crew_size: u32,
) -> Result<TipsDistribution, ValidationError> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    if crew_size == 0 {
        return Err(ValidationError::MustBePositive {
            field: "crew_size".to_string(),
        });
    }

    let (tips_amount, tips_percentage) = match input {
        TipInput::Percentage(percentage) => {
            if percentage.bps() > MAX_TIP_BPS {
                return Err(out_of_range("tips_percentage"));
            }
            (price.percentage(percentage), percentage)
        }
        TipInput::Amount(amount) => {
            if amount.is_negative() {
                return Err(ValidationError::MustNotBeNegative {
                    field: "tips_amount".to_string(),
                });
            }
            let percentage = amount
                .ratio_of(price)
                .filter(|p| p.bps() <= MAX_TIP_BPS)
                .ok_or_else(|| out_of_range("tips_amount"))?;
            (amount, percentage)
        }
    };

    let shares = tips_amount
        .split_evenly(crew_size)
        .into_iter()
        .zip(1..)
        .map(|(amount, crew_member)| CrewShare {
            crew_member,
            amount,
        })
        .collect();

    Ok(TipsDistribution {
        tips_amount,
        tips_percentage,
        shares,
    })
}

fn out_of_range(field: &str) -> ValidationError {
    ValidationError::invalid(field, "tip must be between 0% and 100% of the price")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_tip_three_movers() {
        let dist = distribute(
            Money::from_dollars(200),
            TipInput::Percentage(Percentage::from_whole(15)),
            3,
        )
        .unwrap();

        assert_eq!(dist.tips_amount, Money::from_dollars(30));
        assert_eq!(dist.tips_percentage, Percentage::from_whole(15));
        let amounts: Vec<i64> = dist.shares.iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![1_000, 1_000, 1_000]);
        assert_eq!(dist.shares_total(), dist.tips_amount);
    }

    #[test]
    fn test_amount_tip_seven_movers_keeps_remainder() {
        let dist = distribute(
            Money::from_dollars(100),
            TipInput::Amount(Money::from_dollars(100)),
            7,
        )
        .unwrap();

        assert_eq!(dist.tips_percentage, Percentage::from_whole(100));
        assert_eq!(dist.shares.len(), 7);
        assert_eq!(dist.shares[0].amount.cents(), 1_432);
        assert!(dist.shares[1..].iter().all(|s| s.amount.cents() == 1_428));
        assert_eq!(dist.shares_total(), Money::from_dollars(100));
    }

    #[test]
    fn test_crew_members_numbered_from_one() {
        let dist = distribute(
            Money::from_dollars(100),
            TipInput::Amount(Money::from_dollars(10)),
            4,
        )
        .unwrap();
        let numbers: Vec<u32> = dist.shares.iter().map(|s| s.crew_member).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_amount_derives_percentage() {
        let dist = distribute(
            Money::from_cents(88_123),
            TipInput::Amount(Money::from_cents(13_218)),
            3,
        )
        .unwrap();
        assert_eq!(dist.tips_percentage.bps(), 1_500);
    }

    #[test]
    fn test_zero_tip_is_allowed() {
        let dist = distribute(Money::from_dollars(50), TipInput::Amount(Money::zero()), 2).unwrap();
        assert!(dist.shares.iter().all(|s| s.amount.is_zero()));
    }

    #[test]
    fn test_rejections() {
        let pct = TipInput::Percentage(Percentage::from_whole(10));

        assert!(distribute(Money::zero(), pct, 3).is_err());
        assert!(distribute(Money::from_cents(-100), pct, 3).is_err());
        assert_eq!(
            distribute(Money::from_dollars(10), pct, 0).unwrap_err().field(),
            "crew_size"
        );
        assert_eq!(
            distribute(
                Money::from_dollars(10),
                TipInput::Amount(Money::from_cents(-1)),
                1
            )
            .unwrap_err()
            .field(),
            "tips_amount"
        );
        assert_eq!(
            distribute(
                Money::from_dollars(10),
                TipInput::Percentage(Percentage::from_bps(10_001)),
                1
            )
            .unwrap_err()
            .field(),
            "tips_percentage"
        );
        assert!(distribute(
            Money::from_dollars(10),
            TipInput::Amount(Money::from_dollars(11)),
            1
        )
        .is_err());
    }

    #[test]
    fn test_from_fields_requires_exactly_one() {
        let amount = Some(Money::from_dollars(5));
        let pct = Some(Percentage::from_whole(5));
        assert!(matches!(
            TipInput::from_fields(amount, pct),
            Err(ValidationError::ExactlyOneOf { .. })
        ));
        assert_eq!(
            TipInput::from_fields(None, pct).unwrap(),
            TipInput::Percentage(Percentage::from_whole(5))
        );
    }
}
