use cordyceps_splay::{BasicSeq, SplaySeq};

fn main() {
    let mut seq: SplaySeq<u32> = SplaySeq::new();

    seq.push_back(1);
    seq.push_back(2);
    seq.push_back(3);
    seq.tree().assert_invariants();
    println!("{seq:?}");

    assert_eq!(seq.get(1), Ok(&2));
    println!("{}", seq.dotgraph("after-get"));

    let one = seq.pop_front();
    assert_eq!(one, Some(1));
    seq.tree().assert_invariants();
    println!("{seq:?}");

    let mut tail: SplaySeq<u32> = [4, 5].into_iter().collect();
    seq.append(&mut tail);
    seq.tree().assert_invariants();
    println!("{seq:?}");
    assert_eq!(seq.back(), Some(&5));

    let mut letters: BasicSeq<char> = "abcde".chars().collect();
    let right = letters.split_off(2).unwrap();
    letters.tree().assert_invariants();
    right.tree().assert_invariants();
    println!("{letters:?} {right:?}");

    drop(seq);
}
