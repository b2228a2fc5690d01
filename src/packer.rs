//! DubePacker: a deterministic constructive 3D bin packer.
//!
//! After Dube, E., Kanavathy, L. R., & Woodview, P. (2006). Optimizing
//! Three-Dimensional Bin Packing Through Simulation. Places a batch of
//! cases onto a pallet snapshot, enforcing overlap-freedom, vertical
//! support/stability, and crush-strength constraints. Never mutates its
//! inputs: on success it returns a fresh case list and layer map for the
//! caller to commit; on failure the caller discards everything.

use crate::geometry::{child_position, intersect};
use crate::types::{Case, OrderLineId};
use std::collections::BTreeMap;

pub const MIN_STABLE_SURFACE: f64 = 0.7;
pub const MIN_STABLE_CORNERS: u32 = 3;

enum FitOutcome {
    Rejected,
    Stable(i64),
}

/// Checks whether `candidate` (already positioned) can be placed among
/// `packed`, mutating its `can_hold` in place via the strength cascade.
/// Returns the layer to record for `candidate`'s order line on success.
fn try_fit(
    candidate: &mut Case,
    pallet_dims: (i64, i64, i64),
    packed: &[Case],
    layers: &BTreeMap<OrderLineId, i64>,
) -> FitOutcome {
    let (px, py, pz) = pallet_dims;
    if candidate.right() > px || candidate.back() > py || candidate.top() > pz {
        return FitOutcome::Rejected;
    }

    let item_surface = (candidate.size_x * candidate.size_y) as f64;
    let footholds = [
        (candidate.x, candidate.y),
        (candidate.left(), candidate.back()),
        (candidate.right(), candidate.back()),
        (candidate.right(), candidate.front()),
    ];
    let mut stable_corners = [false; 4];
    let mut stable_sum = 0u32;
    let mut stable_surface = 0.0f64;
    let mut stable = false;

    let obstructable =
        candidate.x != 0 && candidate.y != 0 && candidate.right() != px && candidate.back() != py;
    let mut mask = [true; 5];
    let mut mask_sum = 5;

    let mut current_layer = layers.get(&candidate.order_line).copied();

    for p in packed {
        if intersect(candidate, p) {
            return FitOutcome::Rejected;
        }

        if obstructable {
            let overlap_x = candidate.right().min(p.right()) > candidate.left().max(p.left());
            let overlap_y = candidate.back().min(p.back()) > candidate.front().max(p.front());
            let overlap_z = candidate.top().min(p.top()) > candidate.bottom().max(p.bottom());

            if overlap_y && overlap_z {
                if mask[0] && p.x < candidate.x {
                    mask[0] = false;
                    mask_sum -= 1;
                } else if mask[1] && p.x > candidate.x {
                    mask[1] = false;
                    mask_sum -= 1;
                }
            }
            if overlap_x && overlap_z {
                if mask[2] && p.y < candidate.y {
                    mask[2] = false;
                    mask_sum -= 1;
                } else if mask[3] && p.y > candidate.y {
                    mask[3] = false;
                    mask_sum -= 1;
                }
            }
            if overlap_x && overlap_y && p.z > candidate.z {
                mask[4] = false;
                mask_sum -= 1;
            }
            if mask_sum == 0 {
                return FitOutcome::Rejected;
            }
        }

        if candidate.z == 0 && !stable {
            stable_surface = item_surface;
            stable_corners = [true; 4];
            stable_sum = 4;
            stable = true;
            current_layer = Some(current_layer.unwrap_or(0).max(0));
        } else if candidate.z == p.top() {
            let x1 = candidate.right().min(p.right());
            let x2 = candidate.left().max(p.left());
            let y1 = candidate.back().min(p.back());
            let y2 = candidate.front().max(p.front());
            if x1 > x2 && y1 > y2 {
                if p.can_hold == 0 {
                    return FitOutcome::Rejected;
                }
                candidate.can_hold = candidate.strength.min(p.can_hold - 1).max(0);

                if !stable {
                    stable_surface += ((x1 - x2) * (y1 - y2)) as f64;
                    for (idx, &(fx, fy)) in footholds.iter().enumerate() {
                        if !stable_corners[idx] && x2 <= fx && fx <= x1 && y2 <= fy && fy <= y1 {
                            stable_corners[idx] = true;
                            stable_sum += 1;
                        }
                    }
                    if p.code != candidate.code {
                        let supporter_level = layers.get(&p.order_line).copied().unwrap_or(0) + 1;
                        current_layer =
                            Some(current_layer.map_or(supporter_level, |v| v.max(supporter_level)));
                    }
                    if stable_surface / item_surface > MIN_STABLE_SURFACE
                        || stable_sum >= MIN_STABLE_CORNERS
                    {
                        stable = true;
                    }
                }
            }
        }
    }

    if stable {
        FitOutcome::Stable(current_layer.unwrap_or(0))
    } else {
        FitOutcome::Rejected
    }
}

/// Places `batch` onto a pallet that already holds `existing_cases` (with
/// `existing_layers` recording each of their order lines' stacking level).
/// On success, returns the full case list (existing + newly placed) and the
/// updated layer map. On failure, returns `None` — the caller must discard
/// any partial state, nothing here was committed.
pub fn pack(
    existing_cases: &[Case],
    existing_layers: &BTreeMap<OrderLineId, i64>,
    batch: &[Case],
    pallet_dims: (i64, i64, i64),
) -> Option<(Vec<Case>, BTreeMap<OrderLineId, i64>)> {
    let mut packed: Vec<Case> = existing_cases.to_vec();
    for c in &mut packed {
        c.busy_corners = [false; 3];
    }
    let mut layers = existing_layers.clone();

    let mut sorted_batch: Vec<Case> = batch.to_vec();
    sorted_batch.sort_by(|a, b| b.strength.cmp(&a.strength));

    for mut current in sorted_batch {
        current.busy_corners = [false; 3];

        if packed.is_empty() {
            current.set_pos(0, 0, 0);
            if current.top() > pallet_dims.2 {
                return None;
            }
            if current.right() > pallet_dims.0 || current.back() > pallet_dims.1 {
                current.rotate();
                if current.right() > pallet_dims.0 || current.back() > pallet_dims.1 {
                    return None;
                }
            }
            layers.insert(current.order_line, 0);
            packed.push(current);
            continue;
        }

        let mut placed = false;
        'outer: for k in 0..3 {
            for anchor_idx in 0..packed.len() {
                if packed[anchor_idx].busy_corners[k] {
                    continue;
                }
                let (px, py, pz) = child_position(k, &packed[anchor_idx]);
                current.set_pos(px, py, pz);

                if let FitOutcome::Stable(layer) = try_fit(&mut current, pallet_dims, &packed, &layers)
                {
                    layers.insert(current.order_line, layer);
                    packed[anchor_idx].busy_corners[k] = true;
                    packed.push(current);
                    placed = true;
                    break 'outer;
                }

                current.rotate();
                if let FitOutcome::Stable(layer) = try_fit(&mut current, pallet_dims, &packed, &layers)
                {
                    layers.insert(current.order_line, layer);
                    packed[anchor_idx].busy_corners[k] = true;
                    packed.push(current);
                    placed = true;
                    break 'outer;
                }
                current.rotate();
            }
        }

        if !placed {
            return None;
        }
    }

    Some((packed, layers))
}
