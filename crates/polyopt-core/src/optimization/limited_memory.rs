//! Limited-memory BFGS inverse-Hessian approximation.
//!
//! Stores the m most recent correction pairs
//! `s_k = x_{k+1} − x_k`, `y_k = ∇f(x_{k+1}) − ∇f(x_k)` and applies the
//! implied inverse Hessian to a vector with the two-loop recursion:
//!
//! ```text
//! q = v
//! for i = k-1, ..., k-m:
//!     α_i = ρ_i ⟨s_i, q⟩
//!     q = q − α_i y_i
//! r = γ q,  γ = ⟨s_{k-1}, y_{k-1}⟩ / ⟨y_{k-1}, y_{k-1}⟩
//! for i = k-m, ..., k-1:
//!     β = ρ_i ⟨y_i, r⟩
//!     r = r + (α_i − β) s_i
//! ```
//!
//! Pairs with insufficient curvature (`⟨s, y⟩ ≤ ε ⟨y, y⟩`) are skipped so the
//! approximation stays positive definite.

use crate::types::{dot, Real};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct CorrectionPair {
    s: Vec<Real>,
    y: Vec<Real>,
    rho: Real,
}

/// Bounded history of correction pairs.
#[derive(Debug, Clone)]
pub struct LimitedMemory {
    capacity: usize,
    curvature_epsilon: Real,
    pairs: VecDeque<CorrectionPair>,
}

impl LimitedMemory {
    /// Creates an empty history keeping at most `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            curvature_epsilon: 1e-10,
            pairs: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Sets the curvature threshold ε used to reject pairs.
    pub fn with_curvature_epsilon(mut self, epsilon: Real) -> Self {
        self.curvature_epsilon = epsilon;
        self
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Forgets every pair.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Adds a pair, evicting the oldest when full. Returns `false` if the pair
    /// was rejected for lack of curvature.
    pub fn push(&mut self, s: Vec<Real>, y: Vec<Real>) -> bool {
        let sy = dot(&s, &y);
        let yy = dot(&y, &y);
        if !(sy > self.curvature_epsilon * yy) || yy == 0.0 {
            return false;
        }
        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back(CorrectionPair { s, y, rho: 1.0 / sy });
        true
    }

    /// Replaces `v` by H·v, H the current inverse-Hessian approximation.
    ///
    /// With an empty history H is the identity.
    pub fn apply_inverse_hessian(&self, v: &mut [Real]) {
        let Some(last) = self.pairs.back() else {
            return;
        };

        let mut alpha = vec![0.0; self.pairs.len()];
        for (i, pair) in self.pairs.iter().enumerate().rev() {
            alpha[i] = pair.rho * dot(&pair.s, v);
            v.iter_mut()
                .zip(&pair.y)
                .for_each(|(q, y)| *q -= alpha[i] * y);
        }

        let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
        v.iter_mut().for_each(|r| *r *= gamma);

        for (i, pair) in self.pairs.iter().enumerate() {
            let beta = pair.rho * dot(&pair.y, v);
            v.iter_mut()
                .zip(&pair.s)
                .for_each(|(r, s)| *r += (alpha[i] - beta) * s);
        }
    }
}
