//! Solves the VAT-inclusive sale price that leaves a requested net margin after
//! marketplace commission and VAT.

use crate::domain::model::{MarginMode, PricingParameters, PricingResult};
use crate::utils::error::{EtlError, Result};

/// The factor `total_cost` is scaled by to obtain the gross price, or the
/// infeasibility error when no positive price exists.
///
/// Percentage: `gross = total / (1 - c - m) * (1 + vat)`. The realised net
/// margin is `m - c * vat` of the pre-tax price, since the commission is
/// charged on the VAT-inclusive price.
/// Absolute:   `gross = (m + total) / (1 / (1 + vat) - c)`.
fn denominator(params: &PricingParameters) -> Result<f64> {
    let denominator = match params.margin_mode {
        MarginMode::Percentage => 1.0 - params.commission_rate - params.margin_value,
        MarginMode::Absolute => 1.0 / (1.0 + params.vat_rate) - params.commission_rate,
    };

    if denominator <= 0.0 || !denominator.is_finite() {
        return Err(EtlError::InfeasibleMargin {
            commission_rate: params.commission_rate,
            vat_rate: params.vat_rate,
            margin: params.describe_margin(),
            denominator,
        });
    }

    Ok(denominator)
}

/// Fails when the parameters admit no sale price at all.
pub fn check_feasible(params: &PricingParameters) -> Result<()> {
    denominator(params).map(|_| ())
}

pub fn gross_price(total_cost: f64, params: &PricingParameters) -> Result<f64> {
    let denominator = denominator(params)?;
    Ok(match params.margin_mode {
        MarginMode::Percentage => total_cost / denominator * (1.0 + params.vat_rate),
        MarginMode::Absolute => (params.margin_value + total_cost) / denominator,
    })
}

/// Breaks a gross price down into its pre-tax share, VAT, commission and the
/// net margin left over.
pub fn breakdown(gross_price: f64, total_cost: f64, params: &PricingParameters) -> PricingResult {
    let pre_tax_price = gross_price / (1.0 + params.vat_rate);
    let vat_payable = gross_price - pre_tax_price;
    let commission_amount = gross_price * params.commission_rate;
    let net_margin = pre_tax_price - total_cost - commission_amount;

    PricingResult {
        total_cost,
        gross_price,
        pre_tax_price,
        vat_payable,
        commission_amount,
        net_margin,
    }
}

pub fn solve(cost: f64, shipping: f64, params: &PricingParameters) -> Result<PricingResult> {
    let total_cost = cost + shipping;
    let gross = gross_price(total_cost, params)?;
    Ok(breakdown(gross, total_cost, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn test_absolute_margin_round_trip() {
        let params = PricingParameters::new(0.14, 0.22, MarginMode::Absolute, 27.66);
        let result = solve(100.0, 13.41, &params).unwrap();

        assert!((result.total_cost - 113.41).abs() < TOLERANCE);
        assert!((result.net_margin - 27.66).abs() < TOLERANCE);

        // Recomputed from the gross price alone.
        let pre_tax = result.gross_price / 1.22;
        let recomputed = pre_tax - 113.41 - result.gross_price * 0.14;
        assert!((recomputed - 27.66).abs() < TOLERANCE);
    }

    #[test]
    fn test_percentage_margin_on_pre_tax_price() {
        let params = PricingParameters::new(0.14, 0.22, MarginMode::Percentage, 0.15);
        let result = solve(100.0, 0.0, &params).unwrap();

        // 100 / 0.71 * 1.22
        assert!((result.gross_price - 171.830985915493).abs() < TOLERANCE);
        assert!((result.pre_tax_price - 100.0 / 0.71).abs() < TOLERANCE);
        assert!((result.margin_ratio() - (0.15 - 0.14 * 0.22)).abs() < TOLERANCE);
    }

    #[test]
    fn test_percentage_feasibility_boundary() {
        let params = PricingParameters::new(0.14, 0.22, MarginMode::Percentage, 0.83);
        let result = solve(100.0, 0.0, &params).unwrap();
        assert!((result.gross_price - 100.0 / 0.03 * 1.22).abs() < 1e-3);

        let params = PricingParameters::new(0.5, 0.22, MarginMode::Percentage, 0.45);
        assert!(check_feasible(&params).is_ok());

        let params = PricingParameters::new(0.14, 0.22, MarginMode::Percentage, 0.87);
        match check_feasible(&params) {
            Err(EtlError::InfeasibleMargin { denominator, .. }) => {
                assert!((denominator + 0.01).abs() < TOLERANCE)
            }
            other => panic!("expected InfeasibleMargin, got {:?}", other),
        }
    }

    #[test]
    fn test_breakdown_components_add_up() {
        let params = PricingParameters::new(0.14, 0.22, MarginMode::Absolute, 2.0);
        let result = solve(10.0, 1.5, &params).unwrap();

        assert!((result.pre_tax_price + result.vat_payable - result.gross_price).abs() < TOLERANCE);
        let accounted = result.vat_payable
            + result.commission_amount
            + result.total_cost
            + result.net_margin;
        assert!((accounted - result.gross_price).abs() < TOLERANCE);
    }

    #[test]
    fn test_zero_rates_price_equals_cost_plus_margin() {
        let params = PricingParameters::new(0.0, 0.0, MarginMode::Absolute, 5.0);
        let result = solve(20.0, 0.0, &params).unwrap();
        assert!((result.gross_price - 25.0).abs() < TOLERANCE);
        assert_eq!(result.vat_payable, 0.0);
    }

    #[test]
    fn test_percentage_infeasible() {
        let params = PricingParameters::new(0.9, 0.22, MarginMode::Percentage, 0.15);
        match solve(100.0, 0.0, &params) {
            Err(EtlError::InfeasibleMargin { denominator, .. }) => assert!(denominator < 0.0),
            other => panic!("expected InfeasibleMargin, got {:?}", other),
        }

        let params = PricingParameters::new(0.5, 0.0, MarginMode::Percentage, 0.5);
        assert!(check_feasible(&params).is_err());
    }

    #[test]
    fn test_absolute_infeasible() {
        let params = PricingParameters::new(0.85, 0.22, MarginMode::Absolute, 1.0);
        assert!(matches!(
            solve(10.0, 0.0, &params),
            Err(EtlError::InfeasibleMargin { .. })
        ));
    }
}
