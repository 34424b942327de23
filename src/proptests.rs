use super::tests::{validate_tree, values};
use super::*;
use crate::monoid::Sum;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

/// Positions are reduced against the live length when an op is applied.
#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert {
        pos: usize,
        #[proptest(strategy = "-1000i64..1000")]
        value: i64,
    },
    #[proptest(weight = 2)]
    Remove { pos: usize },
    Set {
        pos: usize,
        #[proptest(strategy = "-1000i64..1000")]
        value: i64,
    },
    Fold { start: usize, end: usize },
    SplitMerge { start: usize, end: usize, at: usize },
    Compact,
}

fn span(a: usize, b: usize, len: usize) -> (usize, usize) {
    let a = a % (len + 1);
    let b = b % (len + 1);
    (a.min(b), a.max(b))
}

const MODULUS: u64 = 1_000_000_007;

/// Composition of affine maps `x -> a * x + b` (mod p), applied left to
/// right. Associative but not commutative.
#[derive(Clone, Copy, Debug, Default)]
struct Affine;

impl Monoid for Affine {
    type Value = (u64, u64);

    fn identity(&self) -> (u64, u64) {
        (1, 0)
    }

    fn combine(&self, f: &(u64, u64), g: &(u64, u64)) -> (u64, u64) {
        (f.0 * g.0 % MODULUS, (f.1 * g.0 + g.1) % MODULUS)
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_vec(seed in any::<u64>(), ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mut t = Treap::with_seed(Sum::<i64>::new(), seed);
        let mut m: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Insert { pos, value } => {
                    let pos = pos % (m.len() + 1);
                    t.insert(pos, value);
                    m.insert(pos, value);
                }
                Op::Remove { pos } => {
                    if m.is_empty() {
                        prop_assert_eq!(t.try_remove(pos), Err(TreapError::OutOfBounds { pos, len: 0 }));
                    } else {
                        let pos = pos % m.len();
                        prop_assert_eq!(t.remove(pos), m.remove(pos));
                    }
                }
                Op::Set { pos, value } => {
                    if !m.is_empty() {
                        let pos = pos % m.len();
                        prop_assert_eq!(t.set(pos, value), std::mem::replace(&mut m[pos], value));
                    }
                }
                Op::Fold { start, end } => {
                    let (l, r) = span(start, end, m.len());
                    prop_assert_eq!(t.fold(l..r), m[l..r].iter().sum::<i64>());
                }
                Op::SplitMerge { start, end, at } => {
                    let (l, r) = span(start, end, m.len());
                    let mut piece = t.split(l..r);
                    let block: Vec<i64> = m.drain(l..r).collect();
                    prop_assert_eq!(values(&piece), block.clone());
                    prop_assert_eq!(values(&t), m.clone());

                    let at = at % (m.len() + 1);
                    t.merge(at, &mut piece);
                    m.splice(at..at, block);
                    prop_assert!(piece.is_empty());
                }
                Op::Compact => {
                    t.compact();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        prop_assert_eq!(values(&t), m.clone());
        prop_assert_eq!(t.total(), m.iter().sum::<i64>());
    }

    #[test]
    fn prop_affine_fold_respects_order(
        seed in any::<u64>(),
        maps in prop::collection::vec((1u64..MODULUS, 0u64..MODULUS), 0..=200),
        ranges in prop::collection::vec((any::<usize>(), any::<usize>()), 1..=32),
    ) {
        let mut t = Treap::with_seed(Affine, seed);
        t.extend(maps.iter().copied());
        validate_tree(&t);

        for (a, b) in ranges {
            let (l, r) = span(a, b, maps.len());
            let expected = maps[l..r]
                .iter()
                .fold(Affine.identity(), |acc, f| Affine.combine(&acc, f));
            prop_assert_eq!(t.fold(l..r), expected);
        }
    }

    #[test]
    fn prop_cursor_rank_matches_position(seed in any::<u64>(), positions in prop::collection::vec(any::<usize>(), 0..=300)) {
        let mut t = Treap::with_seed(Sum::<i64>::new(), seed);
        for (i, pos) in positions.into_iter().enumerate() {
            t.insert(pos % (t.len() + 1), i as i64);
        }

        let mut c = t.cursor_front();
        for expected in 0..t.len() {
            prop_assert_eq!(c.rank(), expected);
            prop_assert_eq!(c.current(), t.get(expected));
            c.move_next();
        }
        prop_assert!(c.is_end());
        prop_assert_eq!(c.distance(&t.cursor_front()), t.len() as isize);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_remove_order_small_set() {
    let items = [10i64, 20, 30, 40, 50, 60];

    for seed in 0..4 {
        let mut base = Treap::with_seed(Sum::<i64>::new(), seed);
        base.extend(items);

        for_each_permutation(&items, |perm| {
            let mut t = base.clone();
            let mut m = items.to_vec();
            for v in perm {
                let pos = m.iter().position(|&x| x == v).unwrap();
                assert_eq!(t.remove(pos), m.remove(pos));
                validate_tree(&t);
                assert_eq!(values(&t), m);
            }
            assert!(t.is_empty());
            assert!(t.root.is_null());
        });
    }
}

#[test]
fn exhaustive_insert_positions_small_set() {
    // Every sequence of insert positions p0..p5 with p_i <= i.
    let n = 6;
    let total: usize = (1..=n).product();
    for code in 0..total {
        let mut t = Treap::with_seed(Sum::<i64>::new(), code as u64);
        let mut m: Vec<i64> = Vec::new();
        let mut rest = code;
        for i in 0..n {
            let pos = rest % (i + 1);
            rest /= i + 1;
            t.insert(pos, i as i64);
            m.insert(pos, i as i64);
        }
        validate_tree(&t);
        assert_eq!(values(&t), m);
    }
}
