//! Aggregation operations for [`Treap`](crate::Treap).
//!
//! A monoid is an associative binary operation with an identity element. The
//! operation does not need to be commutative: folds are always evaluated in
//! sequence order. Violating the laws yields meaningless aggregates, not an
//! error.

use std::marker::PhantomData;
use std::ops::Add;

use num_traits::{Bounded, Zero};

pub trait Monoid {
    type Value: Clone;

    fn identity(&self) -> Self::Value;

    fn combine(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value;
}

/// Addition, with zero as identity.
pub struct Sum<T>(PhantomData<fn() -> T>);

/// Minimum, with the type's largest value as identity.
pub struct Min<T>(PhantomData<fn() -> T>);

/// Maximum, with the type's smallest value as identity.
pub struct Max<T>(PhantomData<fn() -> T>);

macro_rules! marker_impls {
    ($($name:ident),*) => {$(
        impl<T> $name<T> {
            pub fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self::new()
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> std::fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    )*};
}

marker_impls!(Sum, Min, Max);

impl<T: Clone + Zero> Monoid for Sum<T>
where
    for<'a> &'a T: Add<&'a T, Output = T>,
{
    type Value = T;

    #[inline]
    fn identity(&self) -> T {
        T::zero()
    }

    #[inline]
    fn combine(&self, lhs: &T, rhs: &T) -> T {
        lhs + rhs
    }
}

impl<T: Clone + Ord + Bounded> Monoid for Min<T> {
    type Value = T;

    #[inline]
    fn identity(&self) -> T {
        T::max_value()
    }

    #[inline]
    fn combine(&self, lhs: &T, rhs: &T) -> T {
        if rhs < lhs {
            rhs.clone()
        } else {
            lhs.clone()
        }
    }
}

impl<T: Clone + Ord + Bounded> Monoid for Max<T> {
    type Value = T;

    #[inline]
    fn identity(&self) -> T {
        T::min_value()
    }

    #[inline]
    fn combine(&self, lhs: &T, rhs: &T) -> T {
        if rhs > lhs {
            rhs.clone()
        } else {
            lhs.clone()
        }
    }
}

/// A monoid assembled from an identity closure and an operation closure.
///
/// ```rust
/// use implicit_treap::{monoid, Treap};
///
/// let concat = monoid::from_fn(String::new, |a: &String, b: &String| format!("{a}{b}"));
/// let mut t = Treap::with_seed(concat, 7);
/// t.push_back("ab".to_string());
/// t.push_back("cd".to_string());
/// t.insert(1, "-".to_string());
/// assert_eq!(t.fold(..), "ab-cd");
/// ```
#[derive(Clone)]
pub struct FnMonoid<T, E, F> {
    identity: E,
    op: F,
    _marker: PhantomData<fn() -> T>,
}

pub fn from_fn<T, E, F>(identity: E, op: F) -> FnMonoid<T, E, F>
where
    T: Clone,
    E: Fn() -> T,
    F: Fn(&T, &T) -> T,
{
    FnMonoid {
        identity,
        op,
        _marker: PhantomData,
    }
}

impl<T, E, F> Monoid for FnMonoid<T, E, F>
where
    T: Clone,
    E: Fn() -> T,
    F: Fn(&T, &T) -> T,
{
    type Value = T;

    #[inline]
    fn identity(&self) -> T {
        (self.identity)()
    }

    #[inline]
    fn combine(&self, lhs: &T, rhs: &T) -> T {
        (self.op)(lhs, rhs)
    }
}

impl<T, E, F> std::fmt::Debug for FnMonoid<T, E, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMonoid").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_laws<M: Monoid>(m: &M, samples: &[M::Value])
    where
        M::Value: PartialEq + std::fmt::Debug,
    {
        let e = m.identity();
        for x in samples {
            assert_eq!(&m.combine(&e, x), x);
            assert_eq!(&m.combine(x, &e), x);
            for y in samples {
                for z in samples {
                    assert_eq!(
                        m.combine(&m.combine(x, y), z),
                        m.combine(x, &m.combine(y, z))
                    );
                }
            }
        }
    }

    #[test]
    fn test_builtin_laws() {
        let samples = [-7i64, 0, 3, 11, 42];
        check_laws(&Sum::<i64>::new(), &samples);
        check_laws(&Min::<i64>::new(), &samples);
        check_laws(&Max::<i64>::new(), &samples);
    }

    #[test]
    fn test_builtin_identities() {
        assert_eq!(Sum::<u32>::new().identity(), 0);
        assert_eq!(Min::<u8>::new().identity(), u8::MAX);
        assert_eq!(Max::<i16>::new().identity(), i16::MIN);
    }

    #[test]
    fn test_fn_monoid_is_order_sensitive() {
        let m = from_fn(Vec::new, |a: &Vec<u8>, b: &Vec<u8>| {
            let mut out = a.clone();
            out.extend_from_slice(b);
            out
        });
        assert_eq!(m.combine(&vec![1, 2], &vec![3]), vec![1, 2, 3]);
        assert_eq!(m.combine(&vec![3], &vec![1, 2]), vec![3, 1, 2]);
        check_laws(&m, &[vec![], vec![1], vec![2, 3]]);
    }
}
