//! Random candidate pick followed by a bounded (quantity, discount) search.

use rand::Rng;

use super::ledger::{Capacity, StockLedger};
use super::line::{round_money, GeneratedLine};
use crate::config::{CatalogEntry, Policy};

/// Outcome of one selector invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Pick<'a> {
    Line(GeneratedLine),
    /// The drawn product cannot produce a line within the overshoot limit.
    /// Since the remaining amount only shrinks, it never will for this target.
    NoFit(&'a CatalogEntry),
}

/// Best (quantity, discount) combination for one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub quantity: u32,
    pub discount: f64,
    pub amount: f64,
}

impl Fit {
    /// Closer to `remaining` wins; ties keep the lower quantity, then the lower discount.
    fn beats(&self, other: &Fit, remaining: f64) -> bool {
        let mine = (self.amount - remaining).abs();
        let theirs = (other.amount - remaining).abs();
        mine < theirs
            || (mine == theirs && (self.quantity, self.discount) < (other.quantity, other.discount))
    }
}

fn discount_steps(max_discount: f64, step: f64) -> u32 {
    // Tolerate representation error so 10.0 / 0.5 counts 20 steps
    ((max_discount / step) + 1e-9).floor() as u32
}

/// Line amount of `quantity` units at `discount` percent off.
pub fn line_amount(quantity: u32, unit_price: f64, discount: f64) -> f64 {
    round_money(f64::from(quantity) * unit_price * (1.0 - discount / 100.0))
}

fn clamp_quantity(quantity: f64, max_quantity: u32) -> u32 {
    if quantity <= 1.0 {
        1
    } else if quantity >= f64::from(max_quantity) {
        max_quantity
    } else {
        quantity as u32
    }
}

/// Smallest quantity in `1..=upper` whose line amount reaches `amount`.
fn lowest_quantity_for(amount: f64, upper: u32, unit_price: f64, discount: f64) -> u32 {
    let (mut lo, mut hi) = (1u32, upper);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if line_amount(mid, unit_price, discount) >= amount {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Search `1..=max_quantity` and the discount grid for the positive amount
/// closest to `remaining` that stays within `remaining * selection_overshoot`.
/// Ties keep the lower quantity, then the lower discount.
///
/// Line amounts never shrink as the quantity grows, so per discount step only
/// the quantities around `remaining / discounted unit price` can win. The cost
/// depends on the number of discount steps, not on `max_quantity`.
pub fn best_fit(
    unit_price: f64,
    max_discount: f64,
    max_quantity: u32,
    remaining: f64,
    policy: &Policy,
) -> Option<Fit> {
    if max_quantity == 0 {
        return None;
    }
    let limit = remaining * policy.tolerances.selection_overshoot;
    let step = policy.search.discount_step;
    let steps = discount_steps(max_discount, step);
    let mut best: Option<Fit> = None;

    for i in 0..=steps {
        let discount = f64::from(i) * step;
        let unit = unit_price * (1.0 - discount / 100.0);
        if unit <= 0.0 {
            continue;
        }

        let pivot = (remaining / unit).floor();
        for offset in [-1.0, 0.0, 1.0] {
            let quantity = clamp_quantity(pivot + offset, max_quantity);
            let amount = line_amount(quantity, unit_price, discount);
            if amount <= 0.0 || amount > limit {
                continue;
            }

            // Sub-cent units round several quantities to the same amount
            let candidate = Fit {
                quantity: lowest_quantity_for(amount, quantity, unit_price, discount),
                discount,
                amount,
            };
            if best.map_or(true, |b| candidate.beats(&b, remaining)) {
                best = Some(candidate);
            }
        }
    }

    best
}

/// Quantity the search may go up to for `entry`.
fn quantity_ceiling(entry: &CatalogEntry, capacity: Capacity, remaining: f64, policy: &Policy) -> u32 {
    match capacity {
        Capacity::Limited(left) => u32::try_from(left).unwrap_or(u32::MAX),
        Capacity::Unbounded => {
            let cheapest = entry.unit_price_net * (1.0 - entry.discount_ceiling() / 100.0);
            if cheapest <= 0.0 {
                return u32::MAX;
            }
            // One unit of headroom past the last quantity that could still fit
            let fitting = (remaining * policy.tolerances.selection_overshoot / cheapest).floor();
            if fitting >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                (fitting as u32).saturating_add(1)
            }
        }
    }
}

/// Draw one candidate uniformly from `pool` and build its closest-fitting line.
///
/// Returns `None` only for an empty pool.
pub fn select_line<'a, R: Rng>(
    rng: &mut R,
    remaining: f64,
    pool: &[&'a CatalogEntry],
    ledger: &StockLedger,
    foreign_client: bool,
    policy: &Policy,
) -> Option<Pick<'a>> {
    if pool.is_empty() {
        return None;
    }
    let entry = pool[rng.gen_range(0..pool.len())];

    // The ceiling already holds the quantity to the stock left in the ledger
    let ceiling = quantity_ceiling(entry, ledger.capacity(entry), remaining, policy);
    let Some(fit) = best_fit(
        entry.unit_price_net,
        entry.discount_ceiling(),
        ceiling,
        remaining,
        policy,
    ) else {
        return Some(Pick::NoFit(entry));
    };

    Some(Pick::Line(GeneratedLine::build(
        entry,
        fit.quantity,
        fit.discount,
        fit.amount,
        foreign_client,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn product(id: &str, net: f64, max_discount: Option<f64>, stock: Option<i64>) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            name: id.into(),
            reference: None,
            unit_price_net: net,
            unit_price_gross: net * 1.19,
            tax_rate: 19.0,
            max_discount,
            stock,
            unlimited_stock: stock.is_none(),
            allow_backorder: false,
        }
    }

    #[test]
    fn exact_quantity_wins() {
        let fit = best_fit(100.0, 0.0, 50, 200.0, &Policy::default()).unwrap();
        assert_eq!(fit, Fit { quantity: 2, discount: 0.0, amount: 200.0 });
    }

    #[test]
    fn discount_closes_the_gap() {
        // 3 x 100 at 10% off = 270
        let fit = best_fit(100.0, 10.0, 50, 270.0, &Policy::default()).unwrap();
        assert_eq!(fit.quantity, 3);
        assert_eq!(fit.discount, 10.0);
        assert_eq!(fit.amount, 270.0);
    }

    #[test]
    fn overshoot_limit_is_respected() {
        // 2 x 100 = 200 exceeds 190 * 1.05 = 199.5, so only one unit fits
        let fit = best_fit(100.0, 0.0, 50, 190.0, &Policy::default()).unwrap();
        assert_eq!(fit.quantity, 1);
        assert_eq!(fit.amount, 100.0);

        // 104 is within 5% of 100
        let fit = best_fit(104.0, 0.0, 50, 100.0, &Policy::default()).unwrap();
        assert_eq!(fit.amount, 104.0);

        assert!(best_fit(106.0, 0.0, 50, 100.0, &Policy::default()).is_none());
    }

    #[test]
    fn discount_never_exceeds_ceiling() {
        let fit = best_fit(100.0, 2.0, 50, 1.0, &Policy::default());
        assert!(fit.is_none());

        let fit = best_fit(100.0, 2.0, 50, 97.0, &Policy::default()).unwrap();
        assert_eq!(fit.discount, 2.0);
        assert_eq!(fit.amount, 98.0);
    }

    #[test]
    fn ceiling_bounds_quantity() {
        let fit = best_fit(10.0, 0.0, 3, 100.0, &Policy::default()).unwrap();
        assert_eq!(fit.quantity, 3);
        assert_eq!(fit.amount, 30.0);
    }

    #[test]
    fn limited_stock_caps_the_line() {
        let mut rng = StdRng::seed_from_u64(1);
        let widget = product("w", 100.0, None, Some(3));
        let pool = vec![&widget];
        let ledger = StockLedger::new().reserve("w", 2);

        let pick = select_line(&mut rng, 500.0, &pool, &ledger, false, &Policy::default());
        let line = match pick {
            Some(Pick::Line(line)) => line,
            other => panic!("expected a line, got {other:?}"),
        };
        assert_eq!(line.quantity, 1);
        assert_eq!(line.line_net, 100.0);
    }

    #[test]
    fn unlimited_product_reaches_large_targets() {
        let mut rng = StdRng::seed_from_u64(1);
        let hour = product("h", 10.0, None, None);
        let pool = vec![&hour];

        let pick = select_line(&mut rng, 1_000.0, &pool, &StockLedger::new(), false, &Policy::default());
        let line = match pick {
            Some(Pick::Line(line)) => line,
            other => panic!("expected a line, got {other:?}"),
        };
        assert_eq!(line.quantity, 100);
        assert_eq!(line.line_tax, 190.0);
    }

    #[test]
    fn oversized_product_is_reported_as_no_fit() {
        let mut rng = StdRng::seed_from_u64(1);
        let big = product("big", 110.0, None, None);
        let pool = vec![&big];

        let pick = select_line(&mut rng, 100.0, &pool, &StockLedger::new(), false, &Policy::default());
        assert_eq!(pick, Some(Pick::NoFit(&big)));
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let pick = select_line(&mut rng, 100.0, &[], &StockLedger::new(), false, &Policy::default());
        assert!(pick.is_none());
    }

    #[test]
    fn unbounded_ceiling_tracks_remaining() {
        let hour = product("h", 10.0, Some(50.0), None);
        let policy = Policy::default();
        // cheapest unit 5.0, 100 * 1.05 / 5 = 21 fitting, plus one
        assert_eq!(quantity_ceiling(&hour, Capacity::Unbounded, 100.0, &policy), 22);
        assert_eq!(quantity_ceiling(&hour, Capacity::Limited(4), 100.0, &policy), 4);

        // No fixed cap: a cent product may need millions of units
        let cent = product("c", 0.01, Some(50.0), None);
        assert_eq!(
            quantity_ceiling(&cent, Capacity::Unbounded, 20_000.0, &policy),
            4_200_001
        );
        assert_eq!(quantity_ceiling(&hour, Capacity::Unbounded, 1e12, &policy), u32::MAX);
    }

    /// Reference search over every quantity and discount step.
    fn exhaustive_fit(
        unit_price: f64,
        max_discount: f64,
        max_quantity: u32,
        remaining: f64,
        policy: &Policy,
    ) -> Option<Fit> {
        let limit = remaining * policy.tolerances.selection_overshoot;
        let step = policy.search.discount_step;
        let mut best: Option<Fit> = None;
        for quantity in 1..=max_quantity {
            for i in 0..=discount_steps(max_discount, step) {
                let discount = f64::from(i) * step;
                let amount = line_amount(quantity, unit_price, discount);
                if amount <= 0.0 || amount > limit {
                    continue;
                }
                if best.map_or(true, |b| (amount - remaining).abs() < (b.amount - remaining).abs()) {
                    best = Some(Fit { quantity, discount, amount });
                }
            }
        }
        best
    }

    #[test]
    fn direct_search_matches_exhaustive_search() {
        let policy = Policy::default();
        for &price in &[0.003, 0.37, 1.0, 9.99, 45.5, 100.0] {
            for &max_discount in &[0.0, 5.0, 12.5, 100.0] {
                for &ceiling in &[1u32, 7, 400] {
                    for &remaining in &[0.5, 3.0, 47.13, 270.0, 1_000.0] {
                        assert_eq!(
                            best_fit(price, max_discount, ceiling, remaining, &policy),
                            exhaustive_fit(price, max_discount, ceiling, remaining, &policy),
                            "price {price} disc {max_discount} ceiling {ceiling} remaining {remaining}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn huge_ceiling_is_searched_directly() {
        let fit = best_fit(0.01, 50.0, u32::MAX, 20_000.0, &Policy::default()).unwrap();
        assert_eq!(fit, Fit { quantity: 2_000_000, discount: 0.0, amount: 20_000.0 });
    }

    #[test]
    fn deep_stock_fills_target_in_one_line() {
        let mut rng = StdRng::seed_from_u64(1);
        let cent = product("c", 0.01, Some(50.0), Some(5_000_000));
        let pool = vec![&cent];

        let pick = select_line(&mut rng, 20_000.0, &pool, &StockLedger::new(), false, &Policy::default());
        let line = match pick {
            Some(Pick::Line(line)) => line,
            other => panic!("expected a line, got {other:?}"),
        };
        assert_eq!(line.quantity, 2_000_000);
        assert_eq!(line.line_net, 20_000.0);
    }
}
