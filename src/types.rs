//! Core data model: cases, order lines, savings edges, pallets.
//!
//! Cyclic references in the source model (`Edge.Inverse`, `OrderLine.Pallet`,
//! `Pallet.OrderLines`) are resolved with arena ownership: every `Case`,
//! `OrderLine`, `Edge` and `Pallet` lives in a `Vec` owned by the `Solver`
//! (see `solver.rs`) and is referenced by a stable index newtype. Pointer
//! identity in "are these two order lines on the same pallet" becomes
//! `PalletId` equality.

use std::collections::BTreeMap;

/// Standard pallet footprint, millimeters.
pub const PALLET_X: i64 = 120;
pub const PALLET_Y: i64 = 80;
pub const PALLET_Z: i64 = 150;
pub const PALLET_MAX_WEIGHT: i64 = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderLineId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PalletId(pub usize);

/// An axis-aligned box to place on a pallet.
#[derive(Debug, Clone)]
pub struct Case {
    pub code: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub size_x: i64,
    pub size_y: i64,
    pub size_z: i64,
    pub weight: i64,
    pub strength: i64,
    pub rotated: bool,
    pub order_line: OrderLineId,
    pub can_hold: i64,
    /// Packer scratch: which of the three child positions (+X, +Y, +Z)
    /// anchored off this case have already been consumed. Meaningless
    /// outside a `pack()` call in progress — `pack()` clears this on every
    /// case it starts from, including ones carried over from a prior call,
    /// so a committed `Pallet`'s cases never carry stale flags into the
    /// next call.
    pub busy_corners: [bool; 3],
}

impl Case {
    pub fn new(
        code: String,
        size_x: i64,
        size_y: i64,
        size_z: i64,
        weight: i64,
        strength: i64,
        order_line: OrderLineId,
    ) -> Self {
        Case {
            code,
            x: 0,
            y: 0,
            z: 0,
            size_x,
            size_y,
            size_z,
            weight,
            strength,
            rotated: false,
            order_line,
            can_hold: strength,
            busy_corners: [false; 3],
        }
    }

    pub fn left(&self) -> i64 {
        self.x
    }
    pub fn right(&self) -> i64 {
        self.x + self.size_x
    }
    pub fn front(&self) -> i64 {
        self.y
    }
    pub fn back(&self) -> i64 {
        self.y + self.size_y
    }
    pub fn bottom(&self) -> i64 {
        self.z
    }
    pub fn top(&self) -> i64 {
        self.z + self.size_z
    }
    pub fn volume(&self) -> i64 {
        self.size_x * self.size_y * self.size_z
    }

    /// Rotates 90 degrees about Z: swaps SizeX/SizeY only.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.size_x, &mut self.size_y);
        self.rotated = !self.rotated;
    }

    pub fn set_pos(&mut self, x: i64, y: i64, z: i64) {
        self.x = x;
        self.y = y;
        self.z = z;
    }
}

/// A pick request for the cases at one storage location.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub code: String,
    pub location: usize,
    /// Unpositioned case templates; the packer sorts its own working copy
    /// and never mutates these.
    pub cases: Vec<Case>,
    pub pallet: Option<PalletId>,
    pub from_depot: EdgeId,
    pub to_depot: EdgeId,
}

impl OrderLine {
    /// `from_depot`/`to_depot` are placeholders until `Solver::new` builds
    /// the depot edges and backfills them.
    pub fn new(code: String, location: usize, cases: Vec<Case>) -> Self {
        OrderLine {
            code,
            location,
            cases,
            pallet: None,
            from_depot: EdgeId(usize::MAX),
            to_depot: EdgeId(usize::MAX),
        }
    }
}

/// A directed savings arc between two order lines, or order line <-> depot.
#[derive(Debug, Clone)]
pub struct Edge {
    pub origin: Option<OrderLineId>,
    pub destination: Option<OrderLineId>,
    pub cost: f64,
    pub saving: f64,
    pub inverse: EdgeId,
}

/// A container being filled with cases.
#[derive(Debug, Clone)]
pub struct Pallet {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub max_weight: i64,
    pub max_volume: i64,
    pub weight: i64,
    pub volume: i64,
    pub cases: Vec<Case>,
    pub order_lines: Vec<OrderLineId>,
    /// Vertical stacking level recorded per order line, used for pick-route
    /// cost evaluation. Sorted ascending during cost evaluation, with ties
    /// broken by `OrderLine` location id for determinism.
    pub layers: BTreeMap<OrderLineId, i64>,
}

impl Default for Pallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Pallet {
    pub fn new() -> Self {
        Pallet {
            x: PALLET_X,
            y: PALLET_Y,
            z: PALLET_Z,
            max_weight: PALLET_MAX_WEIGHT,
            max_volume: PALLET_X * PALLET_Y * PALLET_Z,
            weight: 0,
            volume: 0,
            cases: Vec::new(),
            order_lines: Vec::new(),
            layers: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> (i64, i64, i64) {
        (self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub pallets: Vec<Pallet>,
    pub cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_swaps_x_and_y_only() {
        let mut c = Case::new("A".into(), 10, 20, 30, 1, 1, OrderLineId(0));
        c.rotate();
        assert_eq!((c.size_x, c.size_y, c.size_z), (20, 10, 30));
        assert!(c.rotated);
        c.rotate();
        assert_eq!((c.size_x, c.size_y, c.size_z), (10, 20, 30));
        assert!(!c.rotated);
    }

    #[test]
    fn derived_queries_match_position_and_extents() {
        let mut c = Case::new("A".into(), 10, 20, 30, 1, 1, OrderLineId(0));
        c.set_pos(5, 6, 7);
        assert_eq!(c.left(), 5);
        assert_eq!(c.right(), 15);
        assert_eq!(c.front(), 6);
        assert_eq!(c.back(), 26);
        assert_eq!(c.bottom(), 7);
        assert_eq!(c.top(), 37);
    }

    #[test]
    fn new_pallet_has_standard_dimensions() {
        let p = Pallet::new();
        assert_eq!(p.size(), (PALLET_X, PALLET_Y, PALLET_Z));
        assert_eq!(p.max_weight, PALLET_MAX_WEIGHT);
        assert_eq!(p.max_volume, PALLET_X * PALLET_Y * PALLET_Z);
    }
}
