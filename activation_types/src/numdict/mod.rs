//! NumDict - associative containers of activation strengths.
//!
//! A `NumDict` maps symbols to floats and may carry a default value that
//! stands in for every key it does not list explicitly. Node outputs, rule
//! weights and selection distributions are all `NumDict`s.

mod selection;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Div, DivAssign, Mul, MulAssign};

use crate::symbols::Symbol;

/// Numeric dictionary keyed by symbols.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumDict {
    values: BTreeMap<Symbol, f64>,

    /// Value reported for keys without an explicit entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<f64>,
}

impl NumDict {
    /// Create a new empty dictionary without a default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty dictionary whose unlisted keys read as `default`.
    pub fn with_default(default: f64) -> Self {
        Self {
            values: BTreeMap::new(),
            default: Some(default),
        }
    }

    /// Build a dictionary from explicit entries, optionally with a default.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Symbol, f64)>,
        default: Option<f64>,
    ) -> Self {
        Self {
            values: pairs.into_iter().collect(),
            default,
        }
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<f64> {
        self.default
    }

    /// Replace the default value.
    pub fn set_default(&mut self, default: Option<f64>) {
        self.default = default;
    }

    /// Value for `key`, falling back to the default.
    pub fn get(&self, key: &Symbol) -> Option<f64> {
        self.values.get(key).copied().or(self.default)
    }

    /// Value for `key`, falling back to the default and then to zero.
    pub fn value(&self, key: &Symbol) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    /// Set the value of a key.
    pub fn set(&mut self, key: Symbol, value: f64) {
        self.values.insert(key, value);
    }

    /// Add `amount` to a key (accumulates with the current value).
    pub fn accumulate(&mut self, key: Symbol, amount: f64) {
        let fill = self.fill();
        let current = self.values.entry(key).or_insert(fill);
        *current += amount;
    }

    /// Remove an explicit entry.
    pub fn remove(&mut self, key: &Symbol) -> Option<f64> {
        self.values.remove(key)
    }

    /// Check whether a key has an explicit entry.
    pub fn contains(&self, key: &Symbol) -> bool {
        self.values.contains_key(key)
    }

    /// Give every key without an explicit entry the value `value`.
    pub fn extend<'a>(&mut self, keys: impl IntoIterator<Item = &'a Symbol>, value: f64) {
        for key in keys {
            self.values.entry(key.clone()).or_insert(value);
        }
    }

    /// Keep only the entries whose keys appear in `keys`.
    pub fn keep<'a>(&self, keys: impl IntoIterator<Item = &'a Symbol>) -> NumDict {
        let values = keys
            .into_iter()
            .filter_map(|key| self.values.get(key).map(|v| (key.clone(), *v)))
            .collect();
        Self {
            values,
            default: self.default,
        }
    }

    /// Iterate over explicit keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &Symbol> {
        self.values.keys()
    }

    /// Iterate over explicit entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of explicit values.
    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }

    /// Entry with the highest value.
    pub fn argmax(&self) -> Option<(&Symbol, f64)> {
        self.values
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, v)| (k, *v))
    }

    /// Drop explicit entries equal to the default (zero when there is none).
    pub fn squeeze(&mut self) {
        let fill = self.fill();
        self.values.retain(|_, v| *v != fill);
    }

    /// Elementwise maximum over the union of keys.
    pub fn max_with(&self, other: &NumDict) -> NumDict {
        self.zip_with(other, f64::max)
    }

    /// Re-key entries, keeping the maximum value when keys collide.
    pub fn transform_keys<F>(&self, func: F) -> NumDict
    where
        F: Fn(&Symbol) -> Symbol,
    {
        let mut values: BTreeMap<Symbol, f64> = BTreeMap::new();
        for (key, value) in &self.values {
            values
                .entry(func(key))
                .and_modify(|v| *v = v.max(*value))
                .or_insert(*value);
        }
        Self {
            values,
            default: self.default,
        }
    }

    /// Check that both dictionaries agree on every key within `tolerance`.
    pub fn is_close(&self, other: &NumDict, tolerance: f64) -> bool {
        let defaults_match = match (self.default, other.default) {
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            (None, None) => true,
            _ => false,
        };

        defaults_match
            && self
                .values
                .keys()
                .chain(other.values.keys())
                .all(|key| (self.fill_for(key) - other.fill_for(key)).abs() <= tolerance)
    }

    /// Multiply every value (and the default) by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for value in self.values.values_mut() {
            *value *= factor;
        }
        if let Some(default) = self.default.as_mut() {
            *default *= factor;
        }
    }

    fn fill(&self) -> f64 {
        self.default.unwrap_or(0.0)
    }

    fn fill_for(&self, key: &Symbol) -> f64 {
        self.values.get(key).copied().unwrap_or_else(|| self.fill())
    }

    fn zip_with<F>(&self, other: &NumDict, op: F) -> NumDict
    where
        F: Fn(f64, f64) -> f64,
    {
        let values = self
            .values
            .keys()
            .chain(other.values.keys())
            .map(|key| (key.clone(), op(self.fill_for(key), other.fill_for(key))))
            .collect();
        let default = match (self.default, other.default) {
            (Some(a), Some(b)) => Some(op(a, b)),
            _ => None,
        };
        Self { values, default }
    }

    fn map_values<F>(&self, op: F) -> NumDict
    where
        F: Fn(f64) -> f64,
    {
        Self {
            values: self.values.iter().map(|(k, v)| (k.clone(), op(*v))).collect(),
            default: self.default.map(&op),
        }
    }
}

impl FromIterator<(Symbol, f64)> for NumDict {
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter, None)
    }
}

impl Add for &NumDict {
    type Output = NumDict;

    fn add(self, rhs: &NumDict) -> NumDict {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Mul for &NumDict {
    type Output = NumDict;

    fn mul(self, rhs: &NumDict) -> NumDict {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl Add<f64> for &NumDict {
    type Output = NumDict;

    fn add(self, rhs: f64) -> NumDict {
        self.map_values(|v| v + rhs)
    }
}

impl Mul<f64> for &NumDict {
    type Output = NumDict;

    fn mul(self, rhs: f64) -> NumDict {
        self.map_values(|v| v * rhs)
    }
}

impl Div<f64> for &NumDict {
    type Output = NumDict;

    fn div(self, rhs: f64) -> NumDict {
        self.map_values(|v| v / rhs)
    }
}

impl MulAssign<f64> for NumDict {
    fn mul_assign(&mut self, rhs: f64) {
        self.scale(rhs);
    }
}

impl DivAssign<f64> for NumDict {
    fn div_assign(&mut self, rhs: f64) {
        self.scale(1.0 / rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(name: &str) -> Symbol {
        Symbol::chunk(name)
    }

    #[test]
    fn test_numdict_basic() {
        let mut d = NumDict::new();
        d.set(chunk("a"), 0.5);

        assert!((d.value(&chunk("a")) - 0.5).abs() < 1e-9);
        assert_eq!(d.get(&chunk("b")), None);
        assert!(d.contains(&chunk("a")));
    }

    #[test]
    fn test_default_fallback() {
        let d = NumDict::with_default(0.0);
        assert_eq!(d.get(&chunk("missing")), Some(0.0));
        assert!(!d.contains(&chunk("missing")));
    }

    #[test]
    fn test_accumulate() {
        let mut d = NumDict::new();
        d.accumulate(chunk("a"), 0.3);
        d.accumulate(chunk("a"), 0.4);

        assert!((d.value(&chunk("a")) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_extend_only_fills_missing() {
        let mut d = NumDict::from_pairs([(chunk("x"), 2.0)], None);
        d.extend(&[chunk("x"), chunk("y")], 1.0);

        assert_eq!(d.value(&chunk("x")), 2.0);
        assert_eq!(d.value(&chunk("y")), 1.0);
    }

    #[test]
    fn test_keep() {
        let d = NumDict::from_pairs([(chunk("a"), 1.0), (chunk("b"), 2.0)], Some(0.0));
        let kept = d.keep(&[chunk("b"), chunk("c")]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept.value(&chunk("b")), 2.0);
        assert_eq!(kept.default_value(), Some(0.0));
    }

    #[test]
    fn test_elementwise_ops_use_defaults() {
        let a = NumDict::from_pairs([(chunk("a"), 1.0)], Some(0.5));
        let b = NumDict::from_pairs([(chunk("b"), 2.0)], Some(1.0));

        let sum = &a + &b;
        assert_eq!(sum.value(&chunk("a")), 2.0);
        assert_eq!(sum.value(&chunk("b")), 2.5);
        assert_eq!(sum.default_value(), Some(1.5));

        let product = &a * &b;
        assert_eq!(product.value(&chunk("a")), 1.0);
        assert_eq!(product.value(&chunk("b")), 1.0);
    }

    #[test]
    fn test_missing_default_drops_result_default() {
        let a = NumDict::from_pairs([(chunk("a"), 1.0)], None);
        let b = NumDict::with_default(1.0);
        assert_eq!((&a + &b).default_value(), None);
    }

    #[test]
    fn test_scalar_ops() {
        let d = NumDict::from_pairs([(chunk("a"), 2.0), (chunk("b"), 4.0)], None);

        let halved = &d / 2.0;
        assert_eq!(halved.value(&chunk("b")), 2.0);

        let mut scaled = d.clone();
        scaled *= 0.25;
        assert_eq!(scaled.value(&chunk("a")), 0.5);

        let shifted = &d + 1.0;
        assert_eq!(shifted.value(&chunk("a")), 3.0);
    }

    #[test]
    fn test_sum_and_argmax() {
        let d = NumDict::from_pairs(
            [(chunk("a"), 0.3), (chunk("b"), 0.9), (chunk("c"), 0.5)],
            None,
        );

        assert!((d.sum() - 1.7).abs() < 1e-9);
        assert_eq!(d.argmax().map(|(k, _)| k.clone()), Some(chunk("b")));
    }

    #[test]
    fn test_squeeze() {
        let mut d = NumDict::from_pairs([(chunk("a"), 0.0), (chunk("b"), 0.4)], Some(0.0));
        d.squeeze();

        assert_eq!(d.len(), 1);
        assert!(d.contains(&chunk("b")));
    }

    #[test]
    fn test_max_with() {
        let a = NumDict::from_pairs([(chunk("a"), 0.2), (chunk("b"), 0.9)], Some(0.0));
        let b = NumDict::from_pairs([(chunk("a"), 0.7)], Some(0.0));

        let m = a.max_with(&b);
        assert_eq!(m.value(&chunk("a")), 0.7);
        assert_eq!(m.value(&chunk("b")), 0.9);
    }

    #[test]
    fn test_transform_keys_keeps_max() {
        let d = NumDict::from_pairs([(Symbol::rule("r1"), 0.2), (Symbol::rule("r2"), 0.6)], None);
        let t = d.transform_keys(|_| chunk("conclusion"));

        assert_eq!(t.len(), 1);
        assert_eq!(t.value(&chunk("conclusion")), 0.6);
    }

    #[test]
    fn test_is_close() {
        let a = NumDict::from_pairs([(chunk("a"), 2.0 / 3.0)], None);
        let b = NumDict::from_pairs([(chunk("a"), 0.666_666_666_7)], None);
        let c = NumDict::from_pairs([(chunk("a"), 0.6)], None);

        assert!(a.is_close(&b, 1e-9));
        assert!(!a.is_close(&c, 1e-9));
        assert!(!a.is_close(&NumDict::with_default(0.0), 1e-9));
    }
}
