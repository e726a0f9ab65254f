//! Capability-dispatched traversal helpers.
//!
//! Each container declares once, through [`Traversable::strategy`], the
//! fastest way it can be walked. The free functions here dispatch on that
//! strategy:
//!
//! 1. `Contiguous`: a plain slice, offered only at or above
//!    [`DIRECT_THRESHOLD`] elements.
//! 2. `Indexed`: random access through [`RandomAccess`].
//! 3. `Cursor`: a boxed iterator for everything else.
//!
//! Every tier visits the same elements in the same order.

use crate::views::KeySet;
use core::ops::ControlFlow;
use std::collections::{BTreeSet, LinkedList, VecDeque};

/// Minimum length at which a container offers its backing slice directly.
pub const DIRECT_THRESHOLD: usize = 100;

/// Index-addressable sequence.
pub trait RandomAccess<T> {
    fn len(&self) -> usize;
    fn at(&self, index: usize) -> &T;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub enum Strategy<'a, T> {
    Contiguous(&'a [T]),
    Indexed(&'a dyn RandomAccess<T>),
    Cursor(Box<dyn Iterator<Item = &'a T> + 'a>),
}

/// A container that can be walked by the traversal helpers.
pub trait Traversable<T> {
    fn strategy(&self) -> Strategy<'_, T>;
}

impl<T> RandomAccess<T> for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
    fn at(&self, index: usize) -> &T {
        &self[index]
    }
}

impl<T> RandomAccess<T> for &[T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
    fn at(&self, index: usize) -> &T {
        &self[index]
    }
}

impl<T, const N: usize> RandomAccess<T> for [T; N] {
    fn len(&self) -> usize {
        N
    }
    fn at(&self, index: usize) -> &T {
        &self[index]
    }
}

impl<T> RandomAccess<T> for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }
    fn at(&self, index: usize) -> &T {
        &self[index]
    }
}

impl<T> Traversable<T> for Vec<T> {
    fn strategy(&self) -> Strategy<'_, T> {
        if Vec::len(self) >= DIRECT_THRESHOLD {
            Strategy::Contiguous(self.as_slice())
        } else {
            Strategy::Indexed(self)
        }
    }
}

impl<T> Traversable<T> for &[T] {
    fn strategy(&self) -> Strategy<'_, T> {
        if <[T]>::len(self) >= DIRECT_THRESHOLD {
            Strategy::Contiguous(*self)
        } else {
            Strategy::Indexed(self)
        }
    }
}

impl<T, const N: usize> Traversable<T> for [T; N] {
    fn strategy(&self) -> Strategy<'_, T> {
        if N >= DIRECT_THRESHOLD {
            Strategy::Contiguous(self.as_slice())
        } else {
            Strategy::Indexed(self)
        }
    }
}

impl<T> Traversable<T> for VecDeque<T> {
    fn strategy(&self) -> Strategy<'_, T> {
        match self.as_slices() {
            (front, []) if front.len() >= DIRECT_THRESHOLD => Strategy::Contiguous(front),
            _ => Strategy::Indexed(self),
        }
    }
}

impl<T> Traversable<T> for LinkedList<T> {
    fn strategy(&self) -> Strategy<'_, T> {
        Strategy::Cursor(Box::new(self.iter()))
    }
}

impl<T> Traversable<T> for BTreeSet<T> {
    fn strategy(&self) -> Strategy<'_, T> {
        Strategy::Cursor(Box::new(self.iter()))
    }
}

impl<'t, K, V, S> Traversable<K> for KeySet<'t, K, V, S> {
    fn strategy(&self) -> Strategy<'_, K> {
        Strategy::Cursor(Box::new(self.iter()))
    }
}

/// Walk `source`, stopping early when `f` breaks.
fn drive<'a, T: 'a, C, F>(source: &'a C, mut f: F)
where
    C: Traversable<T> + ?Sized,
    F: FnMut(usize, &'a T) -> ControlFlow<()>,
{
    match source.strategy() {
        Strategy::Contiguous(items) => {
            for (i, item) in items.iter().enumerate() {
                if f(i, item).is_break() {
                    return;
                }
            }
        }
        Strategy::Indexed(items) => {
            for i in 0..items.len() {
                if f(i, items.at(i)).is_break() {
                    return;
                }
            }
        }
        Strategy::Cursor(items) => {
            for (i, item) in items.enumerate() {
                if f(i, item).is_break() {
                    return;
                }
            }
        }
    }
}

pub fn for_each<T, C, F>(source: &C, mut f: F)
where
    C: Traversable<T> + ?Sized,
    F: FnMut(&T),
{
    drive(source, |_, item| {
        f(item);
        ControlFlow::Continue(())
    });
}

pub fn for_each_with_index<T, C, F>(source: &C, mut f: F)
where
    C: Traversable<T> + ?Sized,
    F: FnMut(&T, usize),
{
    drive(source, |i, item| {
        f(item, i);
        ControlFlow::Continue(())
    });
}

/// Map every element.
pub fn collect<T, U, C, F>(source: &C, mut f: F) -> Vec<U>
where
    C: Traversable<T> + ?Sized,
    F: FnMut(&T) -> U,
{
    let mut out = Vec::new();
    drive(source, |_, item| {
        out.push(f(item));
        ControlFlow::Continue(())
    });
    out
}

/// Elements satisfying `pred`.
pub fn select<'a, T, C, P>(source: &'a C, mut pred: P) -> Vec<&'a T>
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    let mut out = Vec::new();
    drive(source, |_, item| {
        if pred(item) {
            out.push(item);
        }
        ControlFlow::Continue(())
    });
    out
}

/// Elements failing `pred`.
pub fn reject<'a, T, C, P>(source: &'a C, mut pred: P) -> Vec<&'a T>
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    select(source, |item| !pred(item))
}

/// First element satisfying `pred`.
pub fn detect<'a, T, C, P>(source: &'a C, mut pred: P) -> Option<&'a T>
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    let mut found = None;
    drive(source, |_, item| {
        if pred(item) {
            found = Some(item);
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

pub fn any_satisfy<T, C, P>(source: &C, pred: P) -> bool
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    detect(source, pred).is_some()
}

/// True for an empty source.
pub fn all_satisfy<T, C, P>(source: &C, mut pred: P) -> bool
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    detect(source, |item| !pred(item)).is_none()
}

pub fn count<T, C, P>(source: &C, mut pred: P) -> usize
where
    C: Traversable<T> + ?Sized,
    P: FnMut(&T) -> bool,
{
    let mut n = 0;
    drive(source, |_, item| {
        if pred(item) {
            n += 1;
        }
        ControlFlow::Continue(())
    });
    n
}

/// Fold every element into `init`.
pub fn inject_into<T, A, C, F>(init: A, source: &C, mut f: F) -> A
where
    C: Traversable<T> + ?Sized,
    F: FnMut(A, &T) -> A,
{
    let mut acc = Some(init);
    drive(source, |_, item| {
        acc = acc.take().map(|a| f(a, item));
        ControlFlow::Continue(())
    });
    acc.expect("accumulator is restored after every step")
}
