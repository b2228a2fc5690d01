//! Clarke-Wright-style savings merge driving the 3D packer.
//!
//! Builds a dummy one-pallet-per-order-line solution, then walks the
//! saving-sorted edge list once, greedily merging pallets whenever the
//! packer can validate the merge geometrically. The biased-randomized
//! wrapper repeats this with randomized tie-breaks to escape local optima.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CasePickingError, Result};
use crate::packer;
use crate::types::{Edge, EdgeId, OrderLine, OrderLineId, Pallet, PalletId, Solution};

/// beta at which `biased_order` degenerates to the plain saving-sorted
/// order — "effectively greedy" per the savings-merge literature.
pub const GREEDY_BETA: f64 = 0.9999;
pub const BIASED_BETA_RANGE: std::ops::Range<f64> = 0.1..0.3;

pub struct Solver {
    order_lines: Vec<OrderLine>,
    edges: Vec<Edge>,
    savings_order: Vec<EdgeId>,
    dists: Vec<Vec<f64>>,
    rng: StdRng,
    pub history: Vec<f64>,
}

impl Solver {
    /// Builds the depot and pairwise savings edges, and sorts the savings
    /// list descending by saving. `order_lines[i].cases` must already carry
    /// `OrderLineId(i)` as their back-reference.
    pub fn new(mut order_lines: Vec<OrderLine>, dists: Vec<Vec<f64>>, seed: u64) -> Self {
        let mut edges = Vec::new();

        for i in 0..order_lines.len() {
            let location = order_lines[i].location;
            let cost = dists[0][location];
            let from_depot_id = EdgeId(edges.len());
            edges.push(Edge {
                origin: None,
                destination: Some(OrderLineId(i)),
                cost,
                saving: 0.0,
                inverse: EdgeId(edges.len() + 1),
            });
            let to_depot_id = EdgeId(edges.len());
            edges.push(Edge {
                origin: Some(OrderLineId(i)),
                destination: None,
                cost,
                saving: 0.0,
                inverse: from_depot_id,
            });
            order_lines[i].from_depot = from_depot_id;
            order_lines[i].to_depot = to_depot_id;
        }

        let mut savings_order = Vec::new();
        for i in 0..order_lines.len() {
            for j in (i + 1)..order_lines.len() {
                let loc_i = order_lines[i].location;
                let loc_j = order_lines[j].location;
                let cost = dists[loc_i][loc_j];
                let saving = dists[0][loc_i] + dists[0][loc_j] - cost;

                let fwd_id = EdgeId(edges.len());
                let bwd_id = EdgeId(edges.len() + 1);
                edges.push(Edge {
                    origin: Some(OrderLineId(i)),
                    destination: Some(OrderLineId(j)),
                    cost,
                    saving,
                    inverse: bwd_id,
                });
                edges.push(Edge {
                    origin: Some(OrderLineId(j)),
                    destination: Some(OrderLineId(i)),
                    cost,
                    saving,
                    inverse: fwd_id,
                });
                savings_order.push(fwd_id);
            }
        }

        savings_order.sort_by(|a, b| {
            let ea = &edges[a.0];
            let eb = &edges[b.0];
            eb.saving
                .partial_cmp(&ea.saving)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let loc = |e: &Edge| -> (usize, usize) {
                        (
                            e.origin.map(|o| order_lines[o.0].location).unwrap_or(0),
                            e.destination.map(|d| order_lines[d.0].location).unwrap_or(0),
                        )
                    };
                    loc(ea).cmp(&loc(eb))
                })
        });

        Solver {
            order_lines,
            edges,
            savings_order,
            dists,
            rng: StdRng::seed_from_u64(seed),
            history: Vec::new(),
        }
    }

    pub fn order_line_count(&self) -> usize {
        self.order_lines.len()
    }

    /// Runs one greedy savings-merge pass biased by `beta`: higher `beta`
    /// (close to `GREEDY_BETA`) samples the savings list in almost exactly
    /// its sorted order; lower `beta` injects more randomness.
    pub fn heuristic(&mut self, beta: f64) -> Result<Solution> {
        let mut pallets: Vec<Option<Pallet>> = Vec::with_capacity(self.order_lines.len());

        for i in 0..self.order_lines.len() {
            let mut pallet = Pallet::new();
            let dims = pallet.size();
            let packed = packer::pack(&[], &BTreeMap::new(), &self.order_lines[i].cases, dims);
            let (cases, layers) = packed.ok_or_else(|| CasePickingError::Infeasible {
                code: self.order_lines[i].code.clone(),
                location: self.order_lines[i].location as u32,
            })?;
            pallet.weight = cases.iter().map(|c| c.weight).sum();
            pallet.volume = cases.iter().map(|c| c.volume()).sum();
            pallet.cases = cases;
            pallet.layers = layers;
            pallet.order_lines.push(OrderLineId(i));
            self.order_lines[i].pallet = Some(PalletId(i));
            pallets.push(Some(pallet));
        }

        let order = biased_order(&self.savings_order, beta, &mut self.rng);
        for edge_id in order {
            let edge = &self.edges[edge_id.0];
            let (Some(i_id), Some(j_id)) = (edge.origin, edge.destination) else {
                continue;
            };
            let origin = self.order_lines[i_id.0]
                .pallet
                .expect("order line must have a pallet once the dummy solution is built");
            let destination = self.order_lines[j_id.0]
                .pallet
                .expect("order line must have a pallet once the dummy solution is built");
            if origin == destination {
                continue;
            }
            if self.try_absorb(&mut pallets, origin, destination) {
                continue;
            }
            self.try_absorb(&mut pallets, destination, origin);
        }

        let final_pallets: Vec<Pallet> = pallets.into_iter().flatten().collect();
        let cost = self.total_cost(&final_pallets);
        Ok(Solution {
            pallets: final_pallets,
            cost,
        })
    }

    /// Time-bounded multistart: seeds with the greedy pass, then repeats
    /// with a uniformly-drawn beta in `BIASED_BETA_RANGE`, keeping the best.
    /// The deadline is checked only between full `heuristic` calls.
    pub fn biased_randomized(&mut self, budget: Duration) -> Result<Solution> {
        let mut best = self.heuristic(GREEDY_BETA)?;
        let mut history = vec![best.cost];
        let start = Instant::now();

        while start.elapsed() < budget {
            let beta = self.rng.gen_range(BIASED_BETA_RANGE);
            let candidate = self.heuristic(beta)?;
            if candidate.cost < best.cost {
                best = candidate;
            }
            history.push(best.cost);
        }

        self.history = history;
        Ok(best)
    }

    /// Attempts to absorb `destination`'s cases into `origin`. On success,
    /// `destination`'s pallet slot is emptied (released) and every absorbed
    /// order line is retargeted to `origin`.
    fn try_absorb(&mut self, pallets: &mut [Option<Pallet>], origin: PalletId, destination: PalletId) -> bool {
        let (o_weight, o_volume, o_max_weight, o_max_volume) = {
            let p = pallets[origin.0].as_ref().expect("pallet must be present");
            (p.weight, p.volume, p.max_weight, p.max_volume)
        };
        let (d_weight, d_volume) = {
            let p = pallets[destination.0].as_ref().expect("pallet must be present");
            (p.weight, p.volume)
        };
        if o_weight + d_weight > o_max_weight || o_volume + d_volume > o_max_volume {
            return false;
        }

        let (dest_cases, dest_weight, dest_volume, dest_order_lines) = {
            let d = pallets[destination.0].as_ref().expect("pallet must be present");
            (d.cases.clone(), d.weight, d.volume, d.order_lines.clone())
        };

        let packed = {
            let o = pallets[origin.0].as_ref().expect("pallet must be present");
            packer::pack(&o.cases, &o.layers, &dest_cases, o.size())
        };

        match packed {
            Some((cases, layers)) => {
                pallets[destination.0] = None;
                let o = pallets[origin.0].as_mut().expect("pallet must be present");
                o.cases = cases;
                o.layers = layers;
                o.weight += dest_weight;
                o.volume += dest_volume;
                o.order_lines.extend(dest_order_lines.iter().copied());
                for ol in &dest_order_lines {
                    self.order_lines[ol.0].pallet = Some(origin);
                }
                true
            }
            None => false,
        }
    }

    fn total_cost(&self, pallets: &[Pallet]) -> f64 {
        pallets.iter().map(|p| self.pallet_cost(p)).sum()
    }

    /// Sorts a pallet's layer map ascending by layer, breaking ties by
    /// order-line location id for a deterministic pick route, then walks
    /// depot -> ... -> depot summing distances.
    fn pallet_cost(&self, pallet: &Pallet) -> f64 {
        let mut entries: Vec<(OrderLineId, i64)> =
            pallet.layers.iter().map(|(ol, layer)| (*ol, *layer)).collect();
        entries.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| self.order_lines[a.0.0].location.cmp(&self.order_lines[b.0.0].location))
        });

        if entries.is_empty() {
            return 0.0;
        }

        let mut cost = 0.0;
        let first = self.order_lines[entries[0].0.0].location;
        cost += self.dists[0][first];
        for pair in entries.windows(2) {
            let a = self.order_lines[pair[0].0.0].location;
            let b = self.order_lines[pair[1].0.0].location;
            cost += self.dists[a][b];
        }
        let last = self.order_lines[entries[entries.len() - 1].0.0].location;
        cost += self.dists[last][0];
        cost
    }
}

/// Geometric-biased sampling of a saving-sorted id list: repeatedly draws
/// an index via `floor(ln(u) / ln(1 - beta))` from the remaining
/// candidates, so higher-saving edges are more likely, but not certain,
/// to be picked first. At `beta` near 1 this degenerates to index 0 every
/// time, i.e. the plain sorted order.
fn biased_order(ids: &[EdgeId], beta: f64, rng: &mut StdRng) -> Vec<EdgeId> {
    let mut remaining: Vec<EdgeId> = ids.to_vec();
    let mut order = Vec::with_capacity(ids.len());
    while !remaining.is_empty() {
        let u: f64 = rng.r#gen::<f64>();
        let idx = biased_index(u, beta, remaining.len());
        order.push(remaining.remove(idx));
    }
    order
}

/// Pure index selection for `biased_order`, split out so the distribution
/// shape can be tested without going through the RNG.
fn biased_index(u: f64, beta: f64, remaining: usize) -> usize {
    let denom = (1.0 - beta).max(1e-9).ln();
    let idx = (u.max(1e-12).ln() / denom).floor() as usize;
    idx.min(remaining - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Case;

    fn line(code: &str, location: usize, id: usize, sx: i64, sy: i64, sz: i64, strength: i64) -> OrderLine {
        let mut ol = OrderLine::new(code.to_string(), location, Vec::new());
        ol.cases.push(Case::new(code.to_string(), sx, sy, sz, 1, strength, OrderLineId(id)));
        ol
    }

    /// Distance matrix over {depot=0, locA=1, locB=2}: depot-A=3, depot-B=4, A-B=2.
    fn small_dists() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 3.0, 4.0],
            vec![3.0, 0.0, 2.0],
            vec![4.0, 2.0, 0.0],
        ]
    }

    #[test]
    fn merge_succeeds_and_pallet_count_decreases() {
        let lines = vec![
            line("A", 1, 0, 60, 40, 20, 10),
            line("B", 2, 1, 60, 40, 20, 10),
        ];
        let mut solver = Solver::new(lines, small_dists(), 42);
        let sol = solver.heuristic(GREEDY_BETA).expect("feasible");
        assert_eq!(sol.pallets.len(), 1);
        assert_eq!(sol.pallets[0].cases.len(), 2);
        // depot->A->B->depot = 3+2+4 = 9, or the reverse route, same total.
        assert!((sol.cost - 9.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_order_line_union_after_merge() {
        let lines = vec![
            line("A", 1, 0, 60, 40, 20, 10),
            line("B", 2, 1, 60, 40, 20, 10),
        ];
        let mut solver = Solver::new(lines, small_dists(), 7);
        let sol = solver.heuristic(GREEDY_BETA).unwrap();
        assert_eq!(sol.pallets.len(), 1);
        let mut lines_on_pallet: Vec<usize> = sol.pallets[0].order_lines.iter().map(|o| o.0).collect();
        lines_on_pallet.sort();
        assert_eq!(lines_on_pallet, vec![0, 1]);
    }

    #[test]
    fn infeasible_single_line_yields_error() {
        let lines = vec![line("A", 1, 0, 10, 10, 200, 0)];
        let mut solver = Solver::new(lines, small_dists(), 1);
        assert!(solver.heuristic(GREEDY_BETA).is_err());
    }

    #[test]
    fn single_order_line_single_pallet() {
        let lines = vec![line("A", 1, 0, 50, 40, 30, 0)];
        let mut solver = Solver::new(lines, small_dists(), 1);
        let sol = solver.heuristic(GREEDY_BETA).unwrap();
        assert_eq!(sol.pallets.len(), 1);
        assert!((sol.cost - 6.0).abs() < 1e-9); // depot->A->depot = 3+3
    }

    #[test]
    fn greedy_beta_is_deterministic_across_runs() {
        let lines = vec![
            line("A", 1, 0, 60, 40, 20, 10),
            line("B", 2, 1, 60, 40, 20, 10),
        ];
        let mut solver1 = Solver::new(lines.clone(), small_dists(), 1);
        let mut solver2 = Solver::new(lines, small_dists(), 2);
        let sol1 = solver1.heuristic(GREEDY_BETA).unwrap();
        let sol2 = solver2.heuristic(GREEDY_BETA).unwrap();
        assert!((sol1.cost - sol2.cost).abs() < 1e-9);
    }

    #[test]
    fn biased_order_is_a_permutation() {
        let ids: Vec<EdgeId> = (0..10).map(EdgeId).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let order = biased_order(&ids, 0.2, &mut rng);
        let mut sorted: Vec<usize> = order.iter().map(|e| e.0).collect();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn biased_index_prefers_front_of_list_at_greedy_beta() {
        // At beta = 0.9999, ln(1-beta) ~= -9.21; all but vanishingly rare
        // draws of u land index 0.
        assert_eq!(biased_index(0.9, GREEDY_BETA, 10), 0);
        assert_eq!(biased_index(0.5, GREEDY_BETA, 10), 0);
        assert_eq!(biased_index(0.1, GREEDY_BETA, 10), 0);
    }

    #[test]
    fn biased_index_is_clamped_to_remaining_bounds() {
        // u near 0 would overshoot the list length; it must clamp, not panic.
        assert_eq!(biased_index(1e-12, 0.2, 3), 2);
    }

    #[test]
    fn biased_randomized_is_no_worse_than_greedy() {
        let lines = vec![
            line("A", 1, 0, 60, 40, 20, 10),
            line("B", 2, 1, 60, 40, 20, 10),
        ];
        let greedy_cost = {
            let lines2 = vec![
                line("A", 1, 0, 60, 40, 20, 10),
                line("B", 2, 1, 60, 40, 20, 10),
            ];
            let mut s2 = Solver::new(lines2, small_dists(), 99);
            s2.heuristic(GREEDY_BETA).unwrap().cost
        };
        let mut solver = Solver::new(lines, small_dists(), 99);
        let sol = solver.biased_randomized(Duration::from_millis(20)).unwrap();
        assert!(sol.cost <= greedy_cost + 1e-9);
    }
}
