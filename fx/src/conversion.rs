//! Cross-rate and fee arithmetic.

use kursbot_common::{round_rate, CurrencyCode, CurrencyRate};
use rust_decimal::Decimal;

use crate::error::{ArithmeticError, ConversionError, ConversionResult};

/// Rate of one feed row relative to the base currency: `value / nominal`,
/// half-up to six fractional digits.
pub fn unit_rate(
    code: &CurrencyCode,
    nominal: u32,
    value: Decimal,
) -> Result<Decimal, ArithmeticError> {
    if nominal == 0 {
        return Err(ArithmeticError::ZeroNominal(code.clone()));
    }

    let rate = value
        .checked_div(Decimal::from(nominal))
        .map(round_rate)
        .ok_or_else(|| ArithmeticError::Overflow(code.clone()))?;

    if rate <= Decimal::ZERO {
        return Err(ArithmeticError::NonPositiveRate(code.clone()));
    }
    Ok(rate)
}

/// Units of `target` per one unit of `source`, half-up to six fractional digits.
pub fn cross_rate(source: &CurrencyRate, target: &CurrencyRate) -> ConversionResult<Decimal> {
    if target.rate <= Decimal::ZERO {
        return Err(ConversionError::InvalidRate(target.code.clone()));
    }

    source
        .rate
        .checked_div(target.rate)
        .map(round_rate)
        .ok_or_else(|| ConversionError::InvalidRate(target.code.clone()))
}

/// Deduct a percentage fee from `raw`, half-up to six fractional digits.
pub fn apply_fee(raw: Decimal, fee_percent: Decimal) -> Option<Decimal> {
    let keep = Decimal::ONE - fee_percent / Decimal::ONE_HUNDRED;
    raw.checked_mul(keep).map(round_rate)
}

/// Full conversion of `amount`: returns `(result_amount, cross_rate)`.
///
/// The returned cross rate is the pre-fee rate; the fee only affects the amount.
pub fn quote(
    amount: Decimal,
    source: &CurrencyRate,
    target: &CurrencyRate,
    fee_percent: Decimal,
) -> ConversionResult<(Decimal, Decimal)> {
    if amount <= Decimal::ZERO {
        return Err(ConversionError::InvalidAmount(amount));
    }

    let rate = cross_rate(source, target)?;
    let result = amount
        .checked_mul(rate)
        .and_then(|raw| apply_fee(raw, fee_percent))
        .ok_or(ConversionError::InvalidAmount(amount))?;

    Ok((result, rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn rate(code: &str, value: Decimal) -> CurrencyRate {
        CurrencyRate::new(CurrencyCode::new(code), code, value)
    }

    #[test]
    fn test_unit_rate() {
        let usd = CurrencyCode::usd();
        assert_eq!(unit_rate(&usd, 1, dec!(90.5)).unwrap().to_string(), "90.500000");
        assert_eq!(unit_rate(&usd, 100, dec!(61.2345)).unwrap(), dec!(0.612345));
        assert_eq!(unit_rate(&usd, 3, dec!(1)).unwrap(), dec!(0.333333));
        assert_eq!(unit_rate(&usd, 3, dec!(2)).unwrap(), dec!(0.666667));
    }

    #[test]
    fn test_unit_rate_zero_nominal() {
        assert_eq!(
            unit_rate(&CurrencyCode::usd(), 0, dec!(90)),
            Err(ArithmeticError::ZeroNominal(CurrencyCode::usd()))
        );
    }

    #[test]
    fn test_unit_rate_rounds_to_zero() {
        assert_eq!(
            unit_rate(&CurrencyCode::usd(), 10_000, dec!(0.001)),
            Err(ArithmeticError::NonPositiveRate(CurrencyCode::usd()))
        );
    }

    #[test]
    fn test_usd_to_rub_with_fee() {
        let usd = rate("USD", dec!(90.5));
        let rub = rate("RUB", dec!(1));

        let (result, cross) = quote(dec!(100), &usd, &rub, dec!(10)).unwrap();

        assert_eq!(cross, dec!(90.5));
        assert_eq!(result, dec!(8145));
    }

    #[test]
    fn test_foreign_cross_rate() {
        let usd = rate("USD", dec!(90.5));
        let eur = rate("EUR", dec!(98.25));

        let (result, cross) = quote(dec!(100), &usd, &eur, Decimal::ZERO).unwrap();

        assert_eq!(cross, dec!(0.921120));
        assert_eq!(result, dec!(92.112));
    }

    #[test]
    fn test_zero_target_rate() {
        let usd = rate("USD", dec!(90.5));
        let broken = rate("XXX", Decimal::ZERO);

        assert!(matches!(
            quote(dec!(1), &usd, &broken, Decimal::ZERO),
            Err(ConversionError::InvalidRate(code)) if code.code() == "XXX"
        ));
    }

    #[test]
    fn test_non_positive_amount() {
        let usd = rate("USD", dec!(90.5));
        let rub = rate("RUB", dec!(1));

        assert!(matches!(
            quote(dec!(0), &usd, &rub, Decimal::ZERO),
            Err(ConversionError::InvalidAmount(_))
        ));
        assert!(matches!(
            quote(dec!(-5), &usd, &rub, Decimal::ZERO),
            Err(ConversionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_full_fee() {
        assert_eq!(apply_fee(dec!(123.45), dec!(100)).unwrap(), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_unit_rate_is_half_up(nominal in 1u32..10_000, mantissa in 1i64..10_000_000_000) {
            let value = Decimal::new(mantissa, 4);
            if let Ok(rate) = unit_rate(&CurrencyCode::usd(), nominal, value) {
                let exact = value / Decimal::from(nominal);
                prop_assert_eq!(rate, round_rate(exact));
                prop_assert_eq!(rate.scale(), 6);
            }
        }

        #[test]
        fn prop_fee_never_baked_into_rate(
            amount in 1i64..1_000_000,
            src in 1i64..100_000_000,
            tgt in 1i64..100_000_000,
            fee in 0u32..=100,
        ) {
            let source = rate("AAA", Decimal::new(src, 4));
            let target = rate("BBB", Decimal::new(tgt, 4));
            let amount = Decimal::from(amount);
            let fee = Decimal::from(fee);

            let (result, cross) = quote(amount, &source, &target, fee).unwrap();
            let (_, cross_without_fee) = quote(amount, &source, &target, Decimal::ZERO).unwrap();

            prop_assert_eq!(cross, cross_without_fee);
            let keep = Decimal::ONE - fee / Decimal::ONE_HUNDRED;
            prop_assert_eq!(result, round_rate(amount * cross * keep));
        }
    }
}
