use serde::{Deserialize, Serialize};

use crate::point::WGS84Point;

pub const CLOSURE_TOLERANCE_DEG: f64 = 1e-9;

/// Ordered polygon boundary in open representation: the first vertex is not
/// repeated at the end, closure is implied. Winding is kept as given.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ring {
    pub wgs: Vec<WGS84Point>,
}

impl Ring {
    pub fn new(wgs: Vec<WGS84Point>) -> Self {
        Self { wgs }
    }

    /// Builds an open ring from a vertex list that may repeat its first point
    /// as its last, as GeoJSON, KML and closed GPX tracks do.
    pub fn from_closed(mut wgs: Vec<WGS84Point>) -> Self {
        let n = wgs.len();
        if n > 1 && wgs[n - 1].approx_eq(&wgs[0], CLOSURE_TOLERANCE_DEG) {
            wgs.pop();
        }
        Self { wgs }
    }

    pub fn len(&self) -> usize {
        self.wgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wgs.is_empty()
    }

    pub fn points(&self) -> &[WGS84Point] {
        &self.wgs
    }

    // wraps last -> first
    pub fn edges(&self) -> impl Iterator<Item = (&WGS84Point, &WGS84Point)> + '_ {
        let n = self.wgs.len();
        (0..n).map(move |i| (&self.wgs[i], &self.wgs[(i + 1) % n]))
    }

    pub fn closed(&self) -> Vec<WGS84Point> {
        let mut ret = self.wgs.clone();
        if let Some(first) = self.wgs.first() {
            ret.push(*first);
        }
        ret
    }

    pub fn info(&self) {
        log::debug!("ring: len: {}", self.wgs.len());
        if let (Some(first), Some(last)) = (self.wgs.first(), self.wgs.last()) {
            log::trace!("ring: first: {}", first);
            log::trace!("ring: last: {}", last);
        }
    }
}

impl From<Vec<WGS84Point>> for Ring {
    fn from(wgs: Vec<WGS84Point>) -> Self {
        Self { wgs }
    }
}

impl From<Vec<[f64; 2]>> for Ring {
    fn from(pairs: Vec<[f64; 2]>) -> Self {
        Self {
            wgs: pairs.into_iter().map(WGS84Point::from).collect(),
        }
    }
}
