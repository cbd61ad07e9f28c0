//! BitBlt algebra and clipping behavior.

use st80_vm::bitblt::{merge, BitBlt, BitBltInput, Bitmap, DirtyRect};

fn bitmap_16x16(words: [u16; 16]) -> Bitmap {
    Bitmap::new(words.to_vec(), 16, 16).unwrap()
}

fn full_copy_input(rule: i16) -> BitBltInput {
    BitBltInput {
        combination_rule: rule,
        dest_x: 0,
        dest_y: 0,
        width: 16,
        height: 16,
        source_x: 0,
        source_y: 0,
        clip_x: 0,
        clip_y: 0,
        clip_width: 16,
        clip_height: 16,
        source_is_dest: false,
    }
}

fn checkered() -> [u16; 16] {
    let mut words = [0u16; 16];
    for (y, word) in words.iter_mut().enumerate() {
        *word = if y % 2 == 0 { 0xaaaa } else { 0x5555 };
    }
    words
}

#[test]
fn rule_three_copies_the_source_exactly() {
    let source = bitmap_16x16(checkered());
    let dest = bitmap_16x16([0x1234; 16]);

    let (dest, affected) =
        BitBlt::new(Some(source.clone()), dest, None, full_copy_input(3)).copy_bits();

    assert_eq!(dest.words(), source.words());
    assert_eq!(
        affected,
        Some(DirtyRect { x: 0, y: 0, width: 16, height: 16 })
    );
}

#[test]
fn xor_twice_restores_the_destination() {
    let source = bitmap_16x16(checkered());
    let original = bitmap_16x16([0x0f0f; 16]);

    let (once, _) = BitBlt::new(
        Some(source.clone()),
        original.clone(),
        None,
        full_copy_input(6),
    )
    .copy_bits();
    assert_ne!(once.words(), original.words());

    let (twice, _) = BitBlt::new(Some(source), once, None, full_copy_input(6)).copy_bits();
    assert_eq!(twice.words(), original.words());
}

#[test]
fn negative_dest_x_clips_and_shifts_the_source() {
    let source = bitmap_16x16([0xffff; 16]);
    let dest = bitmap_16x16([0x0000; 16]);

    let mut input = full_copy_input(3);
    input.dest_x = -4;

    let (dest, affected) = BitBlt::new(Some(source), dest, None, input).copy_bits();

    // only destination columns 0..=11 receive bits (source columns 4..=15)
    assert_eq!(
        affected,
        Some(DirtyRect { x: 0, y: 0, width: 12, height: 16 })
    );
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(dest.bit(x, y), x < 12, "bit ({x},{y})");
        }
    }
}

#[test]
fn clip_rectangle_bounds_the_write() {
    let source = bitmap_16x16([0xffff; 16]);
    let dest = bitmap_16x16([0x0000; 16]);

    let mut input = full_copy_input(3);
    input.clip_x = 4;
    input.clip_y = 2;
    input.clip_width = 8;
    input.clip_height = 4;

    let (dest, affected) = BitBlt::new(Some(source), dest, None, input).copy_bits();
    assert_eq!(
        affected,
        Some(DirtyRect { x: 4, y: 2, width: 8, height: 4 })
    );
    for y in 0..16 {
        for x in 0..16 {
            let inside = (4..12).contains(&x) && (2..6).contains(&y);
            assert_eq!(dest.bit(x, y), inside, "bit ({x},{y})");
        }
    }
}

#[test]
fn empty_intersection_touches_nothing() {
    let source = bitmap_16x16([0xffff; 16]);
    let dest = bitmap_16x16([0x0000; 16]);

    let mut input = full_copy_input(3);
    input.dest_x = 20;

    let (dest, affected) = BitBlt::new(Some(source), dest, None, input).copy_bits();
    assert_eq!(affected, None);
    assert!(dest.words().iter().all(|&word| word == 0));
}

#[test]
fn halftone_fills_without_a_source() {
    let halftone = bitmap_16x16([0x00ff; 16]);
    let dest = bitmap_16x16([0x0000; 16]);

    let (dest, _) = BitBlt::new(None, dest, Some(halftone), full_copy_input(3)).copy_bits();
    assert!(dest.words().iter().all(|&word| word == 0x00ff));
}

#[test]
fn overlapping_downward_copy_does_not_smear() {
    // shift the whole raster down one line within the same bitmap
    let mut words = [0u16; 16];
    words[0] = 0xbeef;
    let bitmap = bitmap_16x16(words);

    let input = BitBltInput {
        combination_rule: 3,
        dest_x: 0,
        dest_y: 1,
        width: 16,
        height: 15,
        source_x: 0,
        source_y: 0,
        clip_x: 0,
        clip_y: 0,
        clip_width: 16,
        clip_height: 16,
        source_is_dest: true,
    };

    let (dest, _) = BitBlt::new(Some(bitmap.clone()), bitmap, None, input).copy_bits();
    assert_eq!(dest.words()[0], 0xbeef);
    assert_eq!(dest.words()[1], 0xbeef);
    assert!(dest.words()[2..].iter().all(|&word| word == 0));
}

#[test]
fn merge_covers_all_sixteen_rules() {
    let s: i16 = 0b1100;
    let d: i16 = 0b1010;
    let expected: [i16; 16] = [
        0,
        s & d,
        s & !d,
        s,
        !s & d,
        d,
        s ^ d,
        s | d,
        !s & !d,
        !s ^ d,
        !d,
        s | !d,
        !s,
        !s | d,
        !s | !d,
        -1,
    ];
    for (rule, want) in expected.iter().enumerate() {
        assert_eq!(merge(rule as i16, s, d), *want, "rule {rule}");
    }
}
