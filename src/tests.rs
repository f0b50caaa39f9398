use std::{ops::Range, prelude::v1::*, vec};

use proptest::prelude::*;

use crate::model;

use super::*;

type Tree = OrderedTree<SeqNode<u32>>;

fn contents(tree: &Tree) -> Vec<u32> {
    tree.iter().map(|node| *node.value()).collect()
}

fn build<P: Policy>(values: &[u32]) -> Tree {
    let mut tree = Tree::new();
    for &value in values {
        P::emplace_back(&mut tree, value);
    }
    tree
}

// Builds `0..n` by inserting each value at its final position, in the given order.
fn insert_in_order<P: Policy>(order: &[u32]) -> Seq<u32, P> {
    let mut seq = Seq::new();
    let mut present = Vec::new();

    for &value in order {
        let index = present.iter().filter(|&&v| v < value).count();
        present.push(value);

        seq.insert(index, value).expect("index in range");
        seq.tree().assert_invariants();
    }

    seq
}

fn insert_find_all<P: Policy>(order: &[u32]) {
    let mut seq = insert_in_order::<P>(order);

    for value in 0..order.len() as u32 {
        assert_eq!(seq.get(value as usize), Ok(&value));
        seq.tree().assert_invariants();
    }

    assert!(seq.iter().copied().eq(0..order.len() as u32));
}

fn insert_remove_all<P: Policy>(order: &[u32]) {
    let mut seq = insert_in_order::<P>(order);

    for &value in order {
        let index = seq
            .iter()
            .position(|&v| v == value)
            .expect("item not found");
        assert_eq!(seq.remove(index), Ok(value));
        seq.tree().assert_invariants();
    }

    assert!(seq.is_empty());

    let mut seq = insert_in_order::<P>(order);

    for &value in order.iter().rev() {
        let index = seq
            .iter()
            .position(|&v| v == value)
            .expect("item not found");
        assert_eq!(seq.remove(index), Ok(value));
        seq.tree().assert_invariants();
    }

    assert!(seq.is_empty());
}

fn permutations(n: u32) -> Vec<Vec<u32>> {
    if n == 0 {
        return vec![vec![]];
    }

    let mut out = Vec::new();
    for rest in permutations(n - 1) {
        for at in 0..=rest.len() {
            let mut perm = rest.clone();
            perm.insert(at, n - 1);
            out.push(perm);
        }
    }
    out
}

#[test]
fn zero_elems_find() {
    insert_find_all::<Splay>(&[]);
    insert_find_all::<Basic>(&[]);
}

#[test]
fn up_to_four_elems_find() {
    for n in 1..=4 {
        for order in permutations(n) {
            insert_find_all::<Splay>(&order);
            insert_find_all::<Basic>(&order);
        }
    }
}

#[test]
fn up_to_four_elems_remove() {
    for n in 1..=4 {
        for order in permutations(n) {
            insert_remove_all::<Splay>(&order);
            insert_remove_all::<Basic>(&order);
        }
    }
}

#[test]
fn push_find_erase_join() {
    let mut tree = Tree::new();
    Splay::emplace_back(&mut tree, 1);
    Splay::emplace_back(&mut tree, 2);
    Splay::emplace_back(&mut tree, 3);
    tree.assert_invariants();
    assert_eq!(contents(&tree), [1, 2, 3]);
    assert_eq!(tree.len(), 3);

    let node = Splay::find_node_at_index(&mut tree, 1).unwrap();
    assert_eq!(unsafe { node.as_ref().value() }, &2);

    let front = Splay::erase_front(&mut tree).unwrap();
    assert_eq!(front.into_value(), 1);
    tree.assert_invariants();
    assert_eq!(contents(&tree), [2, 3]);

    let mut other = build::<Splay>(&[4, 5]);
    Splay::join(&mut tree, &mut other);
    tree.assert_invariants();
    assert!(other.is_empty());
    assert_eq!(contents(&tree), [2, 3, 4, 5]);
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.last().map(|node| *node.value()), Some(5));
}

#[test]
fn split_five_at_two() {
    fn check<P: Policy>() {
        let mut left: OrderedTree<SeqNode<char>> = OrderedTree::new();
        for value in "abcde".chars() {
            P::emplace_back(&mut left, value);
        }

        let right = P::split_off(&mut left, 2).unwrap();
        left.assert_invariants();
        right.assert_invariants();

        assert_eq!(left.iter().map(|n| *n.value()).collect::<String>(), "ab");
        assert_eq!(right.iter().map(|n| *n.value()).collect::<String>(), "cde");
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 3);
    }

    check::<Splay>();
    check::<Basic>();
}

#[test]
fn split_edges() {
    let mut tree = build::<Splay>(&[0, 1, 2]);

    let empty = Splay::split_off(&mut tree, 3).unwrap();
    assert!(empty.is_empty());
    assert_eq!(contents(&tree), [0, 1, 2]);

    assert_eq!(
        Splay::split_off(&mut tree, 4).err(),
        Some(Error::OutOfRange { index: 4, len: 3 })
    );
    assert_eq!(contents(&tree), [0, 1, 2]);

    let all = Splay::split_off(&mut tree, 0).unwrap();
    assert!(tree.is_empty());
    tree.assert_invariants();
    all.assert_invariants();
    assert_eq!(contents(&all), [0, 1, 2]);
}

#[test]
fn join_front_and_empty_sides() {
    let mut tree = Tree::new();
    let mut other = build::<Splay>(&[1, 2]);

    Splay::join(&mut tree, &mut other);
    assert_eq!(contents(&tree), [1, 2]);

    Splay::join(&mut tree, &mut other);
    assert_eq!(contents(&tree), [1, 2]);

    let mut front = build::<Basic>(&[0]);
    Basic::join_front(&mut tree, &mut front);
    tree.assert_invariants();
    assert!(front.is_empty());
    assert_eq!(contents(&tree), [0, 1, 2]);
}

#[test]
fn erase_range_returns_end() {
    let mut tree = build::<Splay>(&[0, 1, 2, 3, 4, 5]);

    let begin = tree.find_node_at_index(1).unwrap();
    let end = tree.find_node_at_index(4).unwrap();
    let after = unsafe { Splay::erase_nodes(&mut tree, begin, Some(end)) };
    tree.assert_invariants();

    assert_eq!(after, Some(end));
    assert_eq!(contents(&tree), [0, 4, 5]);

    let (handle, next) = unsafe { Basic::erase_node(&mut tree, end) };
    assert_eq!(handle.into_value(), 4);
    assert_eq!(next.map(|n| unsafe { *n.as_ref().value() }), Some(5));
    assert_eq!(contents(&tree), [0, 5]);
}

#[test]
fn insert_values_and_assign() {
    let mut tree = build::<Splay>(&[0, 4]);

    let before = tree.find_node_at_index(1).unwrap();
    let first_new = unsafe { Splay::insert_values_before(&mut tree, Some(before), [1, 2, 3]) };
    tree.assert_invariants();
    assert_eq!(first_new.map(|n| unsafe { *n.as_ref().value() }), Some(1));
    assert_eq!(contents(&tree), [0, 1, 2, 3, 4]);

    let none = unsafe { Splay::insert_values_before(&mut tree, Some(before), []) };
    assert_eq!(none, Some(before));

    Basic::assign(&mut tree, [7, 8]);
    tree.assert_invariants();
    assert_eq!(contents(&tree), [7, 8]);
}

#[test]
fn cursor_walks_through_ghost() {
    let tree = build::<Basic>(&[0, 1, 2]);
    let mut cursor = tree.cursor_last();

    assert_eq!(cursor.current(), Ok(&2));
    cursor.move_next();
    assert_eq!(cursor.current(), Err(Error::InvalidatedIterator));
    assert_eq!(cursor.index(), None);
    assert_eq!(cursor.peek_next().map(|n| *n.value()), Some(0));
    assert_eq!(cursor.peek_prev().map(|n| *n.value()), Some(2));

    cursor.move_next();
    assert_eq!(cursor.current(), Ok(&0));
    assert_eq!(cursor.index(), Some(0));

    let mut other = cursor.clone();
    assert!(cursor == other);
    other.move_next();
    assert!(cursor != other);
    assert_eq!(other.index(), Some(1));
}

#[test]
fn cursor_survives_splaying() {
    let mut seq: SplaySeq<u32> = (0..10).collect();
    let mut cursor = seq.cursor_at_mut(6).unwrap();

    cursor.insert_before(100);
    cursor.insert_after(200);
    assert_eq!(cursor.current(), Ok(&6));
    assert_eq!(cursor.index(), Some(7));

    let removed = cursor.remove_current().map(SeqNode::into_value);
    assert_eq!(removed, Some(6));
    assert_eq!(cursor.current(), Ok(&200));

    let removed = cursor
        .remove_current_and_move_prev()
        .map(SeqNode::into_value);
    assert_eq!(removed, Some(200));
    assert_eq!(cursor.current(), Ok(&100));
    assert_eq!(cursor.as_cursor().index(), Some(6));

    seq.tree().assert_invariants();
    assert!(seq.iter().copied().eq([0, 1, 2, 3, 4, 5, 100, 7, 8, 9]));
}

#[test]
fn basic_policy_degenerates() {
    let tree = build::<Basic>(&(0..200).collect::<Vec<_>>());
    assert_eq!(tree.height(), 200);
    assert_eq!(tree.rotation_count(), 0);
}

#[test]
fn deep_tree_drops() {
    let mut seq = BasicSeq::new();
    for value in 0..10_000u32 {
        seq.push_back(value);
    }

    assert_eq!(seq.iter().next_back(), Some(&9_999));
    drop(seq);
}

#[test]
fn sequential_access_is_amortized() {
    const N: usize = 1024;
    const ROUNDS: usize = 4;

    let mut tree = build::<Splay>(&(0..N as u32).collect::<Vec<_>>());
    let before = tree.rotation_count();

    for _ in 0..ROUNDS {
        for index in 0..N {
            Splay::find_node_at_index(&mut tree, index).unwrap();
        }
    }

    let m = (ROUNDS * N) as u64;
    let log_n = N.ilog2() as u64;
    let rotations = tree.rotation_count() - before;

    tree.assert_invariants();
    assert!(
        rotations <= (m + N as u64) * (3 * log_n + 1),
        "{rotations} rotations for {m} lookups"
    );
}

#[test]
fn split_join_is_amortized() {
    const N: usize = 4096;
    const ROUNDS: usize = 2000;

    let mut tree = build::<Splay>(&(0..N as u32).collect::<Vec<_>>());
    let before = tree.rotation_count();
    let mut tail_rotations = 0;

    for round in 0..ROUNDS {
        let at = if round % 2 == 0 { 1 } else { N - 1 };

        let mut tail = Splay::split_off(&mut tree, at).unwrap();

        // Both halves are left with their boundary nodes at the root.
        assert_eq!(tree.root_raw(), tree.last_raw());
        assert_eq!(tail.root_raw(), tail.first_raw());
        assert_eq!(tail.len(), N - at);

        tail_rotations += tail.rotation_count();
        Splay::join(&mut tree, &mut tail);
    }

    tree.assert_invariants();
    assert!(contents(&tree).into_iter().eq(0..N as u32));

    let m = ROUNDS as u64;
    let n = N as u64;
    let log_n = N.ilog2() as u64;
    let rotations = tree.rotation_count() - before + tail_rotations;

    // Three splays per round, plus the potential gained by each join.
    assert!(
        rotations <= (3 * m + n) * (3 * log_n + 1) + m * log_n,
        "{rotations} rotations for {m} split/join rounds"
    );
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

fn values_and_index() -> impl Strategy<Value = (Vec<u32>, usize)> {
    proptest::collection::vec(any::<u32>(), 1..200).prop_flat_map(|values| {
        let len = values.len();
        (Just(values), 0..len)
    })
}

fn values_and_split() -> impl Strategy<Value = (Vec<u32>, usize)> {
    proptest::collection::vec(any::<u32>(), 0..200).prop_flat_map(|values| {
        let len = values.len();
        (Just(values), 0..=len)
    })
}

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn vec_equivalence_splay(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_vec_equivalence::<Splay>(ops);
    }

    #[test]
    fn vec_equivalence_basic(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_vec_equivalence::<Basic>(ops);
    }

    #[test]
    fn cursor_equivalence_splay(
        values in proptest::collection::vec(any::<u32>(), 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence::<Splay>(values, ops);
    }

    #[test]
    fn cursor_equivalence_basic(
        values in proptest::collection::vec(any::<u32>(), 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence::<Basic>(values, ops);
    }

    #[test]
    fn insert_before_precedes((values, index) in values_and_index(), value in any::<u32>()) {
        let mut tree = build::<Splay>(&values);
        let node = Splay::find_node_at_index(&mut tree, index).unwrap();

        let new = unsafe { Splay::emplace_before(&mut tree, Some(node), value) };
        tree.assert_invariants();

        let mut expected = values.clone();
        expected.insert(index, value);
        prop_assert_eq!(contents(&tree), expected);
        prop_assert_eq!(unsafe { tree.find_next_node(new) }, Some(node));
    }

    #[test]
    fn index_round_trip((values, index) in values_and_index()) {
        let mut tree = build::<Splay>(&values);
        let node = Splay::find_node_at_index(&mut tree, index).unwrap();

        let mut steps = 0;
        let mut cur = node;
        while let Some(prev) = unsafe { tree.find_prev_node(cur) } {
            cur = prev;
            steps += 1;
        }

        prop_assert_eq!(steps, index);
        prop_assert_eq!(Some(cur), tree.first_raw());
        prop_assert_eq!(unsafe { tree.index_of(node) }, index);
    }

    #[test]
    fn split_join_inverse((values, at) in values_and_split()) {
        let mut tree = build::<Splay>(&values);

        let mut tail = Splay::split_off(&mut tree, at).unwrap();
        tree.assert_invariants();
        tail.assert_invariants();
        prop_assert_eq!(tree.len(), at);
        prop_assert_eq!(tail.len(), values.len() - at);

        Splay::join(&mut tree, &mut tail);
        tree.assert_invariants();
        prop_assert!(tail.is_empty());
        prop_assert_eq!(contents(&tree), values);
    }

    #[test]
    fn extremes_match_walk((values, index) in values_and_index(), erase in any::<bool>()) {
        let mut tree = build::<Basic>(&values);

        if erase {
            let node = tree.find_node_at_index(index).unwrap();
            drop(unsafe { Basic::remove(&mut tree, node) });
        }

        let Some(mut node) = tree.root_raw() else {
            prop_assert!(tree.first_raw().is_none() && tree.last_raw().is_none());
            return Ok(());
        };

        let mut first = node;
        while let Some(prev) = unsafe { tree.find_prev_node(first) } {
            first = prev;
        }
        while let Some(next) = unsafe { tree.find_next_node(node) } {
            node = next;
        }

        prop_assert_eq!(tree.first_raw(), Some(first));
        prop_assert_eq!(tree.last_raw(), Some(node));
    }
}
