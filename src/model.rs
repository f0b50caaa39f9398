//! Model-based checking of [`Seq`] against [`Vec`].
//!
//! Each runner applies a list of operations to a `Seq` and to a `Vec` in lockstep and asserts
//! that every observation agrees. The runners are generic over the [`Policy`], and are shared by
//! the proptest suite and the fuzz targets.

use std::prelude::v1::*;

use arbitrary::Arbitrary;
use proptest::{
    collection::vec as vec_of,
    strategy::{Just, Strategy},
};

use crate::{Error, Policy, Seq, SeqNode, TreeNode};

#[derive(Clone, Debug, Arbitrary)]
pub enum Op {
    PushFront(u32),
    PushBack(u32),
    PopFront,
    PopBack,
    Insert(usize, u32),
    Remove(usize),
    Get(usize),
    Peek(usize),
    Set(usize, u32),
    Append(Vec<u32>),
    Prepend(Vec<u32>),
    SplitJoin(usize),
    Truncate(usize),
    Clear,
}

// Indices are reduced so that most of them land in range and the rest are just past the end.
fn reduce(index: usize, len: usize) -> usize {
    index % (len + 2)
}

fn out_of_range<T>(index: usize, len: usize) -> Result<T, Error> {
    Err(Error::OutOfRange { index, len })
}

fn values_strategy() -> impl Strategy<Value = Vec<u32>> {
    vec_of(0u32..1000, 0..8)
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        (0u32..1000).prop_map(Op::PushFront),
        (0u32..1000).prop_map(Op::PushBack),
        Just(Op::PopFront),
        Just(Op::PopBack),
        (0usize..1000, 0u32..1000).prop_map(|(i, v)| Op::Insert(i, v)),
        (0usize..1000).prop_map(Op::Remove),
        (0usize..1000).prop_map(Op::Get),
        (0usize..1000).prop_map(Op::Peek),
        (0usize..1000, 0u32..1000).prop_map(|(i, v)| Op::Set(i, v)),
        values_strategy().prop_map(Op::Append),
        values_strategy().prop_map(Op::Prepend),
        (0usize..1000).prop_map(Op::SplitJoin),
        (0usize..1000).prop_map(Op::Truncate),
        Just(Op::Clear),
    ]
}

pub fn run_vec_equivalence<P: Policy>(ops: Vec<Op>) {
    let mut vec: Vec<u32> = Vec::with_capacity(ops.len());
    let mut seq: Seq<u32, P> = Seq::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let len = vec.len();

        match &op {
            &Op::PushFront(value) => {
                vec.insert(0, value);
                seq.push_front(value);
            }

            &Op::PushBack(value) => {
                vec.push(value);
                seq.push_back(value);
            }

            Op::PopFront => {
                let from_vec = (!vec.is_empty()).then(|| vec.remove(0));
                let from_seq = seq.pop_front();

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            Op::PopBack => {
                let from_vec = vec.pop();
                let from_seq = seq.pop_back();

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            &Op::Insert(index, value) => {
                let index = reduce(index, len);

                let from_vec = if index <= len {
                    vec.insert(index, value);
                    Ok(())
                } else {
                    out_of_range(index, len)
                };
                let from_seq = seq.insert(index, value);

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            &Op::Remove(index) => {
                let index = reduce(index, len);

                let from_vec = if index < len {
                    Ok(vec.remove(index))
                } else {
                    out_of_range(index, len)
                };
                let from_seq = seq.remove(index);

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            &Op::Get(index) => {
                let index = reduce(index, len);

                let from_vec = vec.get(index).ok_or(Error::OutOfRange { index, len });
                let from_seq = seq.get(index);

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            &Op::Peek(index) => {
                let index = reduce(index, len);

                let from_vec = vec.get(index).ok_or(Error::OutOfRange { index, len });
                let from_seq = seq.peek(index);

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            &Op::Set(index, value) => {
                let index = reduce(index, len);

                let from_vec = vec
                    .get_mut(index)
                    .map(|slot| core::mem::replace(slot, value))
                    .ok_or(Error::OutOfRange { index, len });
                let from_seq = seq
                    .get_mut(index)
                    .map(|slot| core::mem::replace(slot, value));

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            Op::Append(values) => {
                vec.extend(values.iter().copied());

                let mut other: Seq<u32, P> = values.iter().copied().collect();
                seq.append(&mut other);
                assert!(other.is_empty(), "Op #{op_id}: {op:?}");
            }

            Op::Prepend(values) => {
                let mut front = values.clone();
                front.append(&mut vec);
                vec = front;

                let mut other: Seq<u32, P> = values.iter().copied().collect();
                seq.prepend(&mut other);
                assert!(other.is_empty(), "Op #{op_id}: {op:?}");
            }

            &Op::SplitJoin(at) => {
                let at = reduce(at, len);

                match seq.split_off(at) {
                    Ok(mut tail) => {
                        assert!(at <= len, "Op #{op_id}: {op:?}");
                        seq.tree().assert_invariants();
                        tail.tree().assert_invariants();

                        assert!(seq.iter().eq(&vec[..at]), "Op #{op_id}: {op:?}");
                        assert!(tail.iter().eq(&vec[at..]), "Op #{op_id}: {op:?}");

                        seq.append(&mut tail);
                        assert!(tail.is_empty(), "Op #{op_id}: {op:?}");
                    }

                    Err(e) => assert_eq!(
                        Err::<(), _>(e),
                        out_of_range(at, len),
                        "Op #{op_id}: {op:?}"
                    ),
                }
            }

            &Op::Truncate(at) => {
                let at = reduce(at, len);

                let from_vec = if at <= len {
                    Ok(vec.split_off(at))
                } else {
                    out_of_range(at, len)
                };
                let from_seq = seq
                    .split_off(at)
                    .map(|tail| tail.into_iter().collect::<Vec<_>>());

                assert_eq!(from_vec, from_seq, "Op #{op_id}: {op:?}");
            }

            Op::Clear => {
                vec.clear();
                seq.clear();
            }
        }

        seq.tree().assert_invariants();
        assert_eq!(vec.len(), seq.len());
        assert_eq!(vec.first(), seq.front());
        assert_eq!(vec.last(), seq.back());
        assert!(vec.iter().eq(seq.iter()));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    Index,
    InsertBefore(u32),
    InsertAfter(u32),
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        Just(CursorOp::Index),
        (0u32..1000).prop_map(CursorOp::InsertBefore),
        (0u32..1000).prop_map(CursorOp::InsertAfter),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            u32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = (0..num_values).map(|_| value(u)).collect();

        let ops = (0..num_ops).map(|_| op(u)).collect();

        Ok(CursorEquivalenceInput { values, ops })
    }
}

pub fn run_cursor_equivalence<P: Policy>(values: Vec<u32>, ops: Vec<CursorOp>) {
    // Ideally this would be a LinkedList cursor, but that is not stable :(
    let mut vec = values.clone();
    let mut seq: Seq<u32, P> = values.into_iter().collect();

    fn vec_curs_prev(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut vec_curs = vec_curs_next(&vec, None);

    {
        let mut seq_curs = seq.cursor_front_mut();

        // Check that the initial states are equivalent.
        {
            let v = vec_curs.map(|i| &vec[i]);
            let s = seq_curs.current().ok();

            assert_eq!(v, s);
        }

        for op in ops {
            match op {
                CursorOp::MoveNext => {
                    vec_curs = vec_curs_next(&vec, vec_curs);
                    seq_curs.move_next();
                }

                CursorOp::MovePrev => {
                    vec_curs = vec_curs_prev(&vec, vec_curs);
                    seq_curs.move_prev();
                }

                CursorOp::PeekNext => {
                    let v = vec_curs_next(&vec, vec_curs).map(|i| &vec[i]);
                    let s = seq_curs.peek_next().map(SeqNode::value);

                    assert_eq!(v, s);
                }

                CursorOp::PeekPrev => {
                    let v = vec_curs_prev(&vec, vec_curs).map(|i| &vec[i]);
                    let s = seq_curs.peek_prev().map(SeqNode::value);

                    assert_eq!(v, s);
                }

                CursorOp::Index => {
                    assert_eq!(vec_curs, seq_curs.index());
                }

                CursorOp::InsertBefore(value) => {
                    match vec_curs {
                        Some(i) => {
                            vec.insert(i, value);
                            vec_curs = Some(i + 1);
                        }
                        None => vec.push(value),
                    }

                    seq_curs.insert_before(value);
                }

                CursorOp::InsertAfter(value) => {
                    match vec_curs {
                        Some(i) => vec.insert(i + 1, value),
                        None => vec.insert(0, value),
                    }

                    seq_curs.insert_after(value);
                }

                CursorOp::RemoveCurrent => {
                    let v = vec_curs.map(|i| vec.remove(i));

                    if vec_curs == Some(vec.len()) {
                        vec_curs = None;
                    }

                    let s = seq_curs.remove_current().map(SeqNode::into_value);

                    assert_eq!(v, s);
                }

                CursorOp::RemoveCurrentMovePrev => {
                    let new_v_curs = vec_curs.is_some().then(|| vec_curs_prev(&vec, vec_curs));
                    let v = vec_curs.map(|i| vec.remove(i));

                    if let Some(vc) = new_v_curs {
                        vec_curs = vc;
                    }

                    let s = seq_curs
                        .remove_current_and_move_prev()
                        .map(SeqNode::into_value);

                    assert_eq!(v, s);
                }
            }

            let v = vec_curs.map(|i| &vec[i]);
            let s = seq_curs.current().ok();

            assert_eq!(v, s);
        }
    }

    seq.tree().assert_invariants();
    assert!(vec.iter().eq(seq.iter()));
}
