use super::*;
use pretty_assertions::assert_eq;

#[test]
fn narrow_atomic_round_trips() {
    let block = SlotBlock::new(LayoutKind::FlatAtomic, 1, 4);
    block.write(2, &[0xDEAD_BEEF]);

    let mut out = [0u64];
    block.read(2, &mut out);
    assert_eq!(out[0], 0xDEAD_BEEF);

    block.read(0, &mut out);
    assert_eq!(out[0], 0);
}

#[test]
fn wide_atomic_round_trips() {
    let block = SlotBlock::new(LayoutKind::FlatAtomic, 3, 2);
    block.write(1, &[1, 2, 3]);

    let mut out = [0u64; 3];
    block.read(1, &mut out);
    assert_eq!(out, [1, 2, 3]);
    block.read(0, &mut out);
    assert_eq!(out, [0, 0, 0]);
}

#[test]
fn zero_width_slots_are_no_ops() {
    let block = SlotBlock::new(LayoutKind::FlatNonAtomic, 0, 3);
    block.write(1, &[]);
    block.read(2, &mut []);
    assert_eq!(block.words_per_slot(), 0);
}

#[test]
fn slots_are_independent() {
    let block = SlotBlock::new(LayoutKind::FlatNonAtomic, 2, 3);
    block.write(0, &[10, 11]);
    block.write(1, &[20, 21]);
    block.write(2, &[30, 31]);

    let mut out = [0u64; 2];
    block.read(1, &mut out);
    assert_eq!(out, [20, 21]);
    block.read(0, &mut out);
    assert_eq!(out, [10, 11]);
}

/// Two writers publish distinct full-width patterns into one wide atomic
/// slot; readers must only ever observe the initial fill or one of the two
/// patterns, never a mix.
#[test]
fn wide_atomic_reads_are_never_torn() {
    const WORDS: usize = 4;
    const A: [u64; WORDS] = [0x1111_1111_1111_1111; WORDS];
    const B: [u64; WORDS] = [0x2222_2222_2222_2222; WORDS];
    const ROUNDS: usize = 2_000;

    let block = SlotBlock::new(LayoutKind::FlatAtomic, WORDS, 1);

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..ROUNDS {
                block.write(0, &A);
            }
        });
        s.spawn(|| {
            for _ in 0..ROUNDS {
                block.write(0, &B);
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                let mut out = [0u64; WORDS];
                for _ in 0..ROUNDS {
                    block.read(0, &mut out);
                    assert!(
                        out == [0; WORDS] || out == A || out == B,
                        "torn read: {out:x?}"
                    );
                }
            });
        }
    });
}

/// Writers to distinct slots never block each other's readers.
#[test]
fn wide_atomic_slots_do_not_interfere() {
    const WORDS: usize = 2;
    let block = SlotBlock::new(LayoutKind::FlatAtomic, WORDS, 2);
    block.write(0, &[7, 7]);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..1_000u64 {
                block.write(1, &[i, i]);
            }
        });
        s.spawn(|| {
            let mut out = [0u64; WORDS];
            for _ in 0..1_000 {
                block.read(0, &mut out);
                assert_eq!(out, [7, 7]);
            }
        });
    });
}
