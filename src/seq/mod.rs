//! Miscellaneous sequence and collection helpers without a specific theme.
//!
//! These come up often enough across projects to warrant living as a tested
//! module. When a group of them accumulates enough continuity it graduates
//! into a module of its own (which is how [`crate::files`] started).

use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::Hash;

/// Compose two functions into one, applying `f` first and then `g`.
///
/// ```
/// use plox_tools::seq::compose;
///
/// let square = |x: i32| x * x;
/// let half = |x: i32| x / 2;
/// assert_eq!(compose(square, half)(3), 4);
/// assert_eq!(compose(square, half)(2), 2);
/// ```
pub fn compose<A, B, C>(f: impl Fn(A) -> B, g: impl Fn(B) -> C) -> impl Fn(A) -> C {
    move |x| g(f(x))
}

/// Split a map into two based on a key predicate.
///
/// Entries whose key satisfies the predicate land in the first map, the rest
/// in the second.
pub fn partition<K, V, F>(map: HashMap<K, V>, mut pred: F) -> (HashMap<K, V>, HashMap<K, V>)
where
    K: Eq + Hash,
    F: FnMut(&K) -> bool,
{
    let mut matching = HashMap::new();
    let mut rest = HashMap::new();
    for (key, value) in map {
        if pred(&key) {
            matching.insert(key, value);
        } else {
            rest.insert(key, value);
        }
    }
    (matching, rest)
}

/// An arbitrarily nested list of items.
///
/// Exists so deeply nested structures can be flattened with
/// [`unnest`](Nested::unnest) regardless of nesting depth; empty lists
/// vanish without a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nested<T> {
    /// A single leaf value
    Item(T),
    /// A list of further nested values
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Flatten to a flat vector of leaf items, preserving order.
    ///
    /// ```
    /// use plox_tools::seq::Nested;
    ///
    /// let nested = Nested::List(vec![
    ///     Nested::Item("a"),
    ///     Nested::List(vec![Nested::List(vec![Nested::Item("b")])]),
    ///     Nested::List(vec![]),
    /// ]);
    /// assert_eq!(nested.unnest(), vec!["a", "b"]);
    /// ```
    pub fn unnest(self) -> Vec<T> {
        let mut acc = Vec::new();
        self.extract(&mut acc);
        acc
    }

    fn extract(self, acc: &mut Vec<T>) {
        match self {
            Nested::Item(item) => acc.push(item),
            Nested::List(items) => {
                for item in items {
                    item.extract(acc);
                }
            }
        }
    }
}

/// Return a sliding window (of width `n`) over data from the iterable.
///
/// `s -> (s0, s1, ..s[n-1]), (s1, s2, .., sn), ...`
///
/// When `n` exceeds the sequence length, a single window holding the whole
/// sequence is yielded.
///
/// ```
/// use plox_tools::seq::windows;
///
/// let pairs: Vec<Vec<u32>> = windows(0..4, 2).collect();
/// assert_eq!(pairs, vec![vec![0, 1], vec![1, 2], vec![2, 3]]);
/// ```
pub fn windows<I>(iter: I, n: usize) -> Windows<I::IntoIter>
where
    I: IntoIterator,
{
    Windows { iter: iter.into_iter(), size: n, buf: VecDeque::new(), primed: false, done: false }
}

/// Iterator returned by [`windows`].
#[derive(Debug, Clone)]
pub struct Windows<I: Iterator> {
    iter: I,
    size: usize,
    buf: VecDeque<I::Item>,
    primed: bool,
    done: bool,
}

impl<I> Iterator for Windows<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.size == 0 {
            return None;
        }

        if !self.primed {
            self.primed = true;
            while self.buf.len() < self.size {
                match self.iter.next() {
                    Some(item) => self.buf.push_back(item),
                    None => {
                        // shorter than one window: the whole sequence is it
                        self.done = true;
                        if self.buf.is_empty() {
                            return None;
                        }
                        return Some(self.buf.iter().cloned().collect());
                    }
                }
            }
            return Some(self.buf.iter().cloned().collect());
        }

        match self.iter.next() {
            Some(item) => {
                self.buf.pop_front();
                self.buf.push_back(item);
                Some(self.buf.iter().cloned().collect())
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose() {
        fn square(x: i32) -> i32 {
            x * x
        }
        fn half(x: i32) -> i32 {
            x / 2
        }

        assert_eq!(compose(square, half)(3), 4);
        assert_eq!(compose(square, half)(2), 2);

        // chains compose further
        let add_one = |x: i32| x + 1;
        assert_eq!(compose(compose(square, half), add_one)(3), 5);
    }

    #[test]
    fn test_partition() {
        let d: HashMap<&str, i32> = [("a", 10), ("B", 20), ("c", 30), ("D", 50)].into();
        let (lower, upper) = partition(d, |k| k.chars().all(char::is_lowercase));
        assert_eq!(lower, [("a", 10), ("c", 30)].into());
        assert_eq!(upper, [("B", 20), ("D", 50)].into());

        let d: HashMap<&str, &str> = [("a", "b"), ("c", "d")].into();
        let (matching, rest) = partition(d, |k| *k == "default");
        assert!(matching.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_unnest() {
        assert_eq!(Nested::<&str>::List(vec![]).unnest(), Vec::<&str>::new());
        assert_eq!(Nested::Item("a").unnest(), vec!["a"]);
        assert_eq!(Nested::List(vec![Nested::Item("a")]).unnest(), vec!["a"]);
        assert_eq!(
            Nested::List(vec![Nested::List(vec![Nested::List(vec![Nested::List(vec![
                Nested::Item("a")
            ])])])])
            .unnest(),
            vec!["a"]
        );
        assert_eq!(
            Nested::List(vec![
                Nested::Item("a"),
                Nested::Item("b"),
                Nested::List(vec![Nested::Item("c")]),
                Nested::List(vec![]),
            ])
            .unnest(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_windows_pairs() {
        let got: Vec<Vec<&str>> = windows(["a", "b", "c", "d"], 2).collect();
        assert_eq!(got, vec![vec!["a", "b"], vec!["b", "c"], vec!["c", "d"]]);

        let got: Vec<Vec<&str>> = windows(["a", "b", "c"], 2).collect();
        assert_eq!(got, vec![vec!["a", "b"], vec!["b", "c"]]);
    }

    #[test]
    fn test_windows_wider() {
        let got: Vec<Vec<&str>> = windows(["a", "b", "c", "d"], 3).collect();
        assert_eq!(got, vec![vec!["a", "b", "c"], vec!["b", "c", "d"]]);

        // wider than the sequence: one window with everything
        let got: Vec<Vec<&str>> = windows(["a", "b", "c", "d"], 57).collect();
        assert_eq!(got, vec![vec!["a", "b", "c", "d"]]);
    }

    #[test]
    fn test_windows_edges() {
        let got: Vec<Vec<u32>> = windows(std::iter::empty::<u32>(), 2).collect();
        assert!(got.is_empty());

        let got: Vec<Vec<u32>> = windows(0..10, 0).collect();
        assert!(got.is_empty());

        let got: Vec<Vec<u32>> = windows(0..10, 2).collect();
        assert_eq!(got.len(), 9);
        assert_eq!(got[0], vec![0, 1]);
        assert_eq!(got[8], vec![8, 9]);
    }
}
