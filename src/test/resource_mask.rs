use crate::error::MaskError;
use crate::net::ResourceMask;
use crate::proto::LabelSet;

#[test]
fn full_mask_has_no_bits_beyond_width() {
    let m = ResourceMask::full(70);
    assert_eq!(m.len(), 70);
    assert_eq!(m.count_available(), 70);
    assert!(m.is_available(69));
    assert!(!m.is_available(70));
    assert_eq!(m.available().last(), Some(69));

    let e = ResourceMask::empty(70);
    assert!(e.is_empty());
    assert_eq!(e.first_available(), None);
}

#[test]
fn set_used_then_clear_round_trips_and_detects_misuse() {
    let mut m = ResourceMask::full(4);
    m.set_used(1).expect("free");
    assert_eq!(m.set_used(1), Err(MaskError::AlreadyUsed(1)));
    assert_eq!(m.first_available(), Some(0));
    assert_eq!(m.available().collect::<Vec<_>>(), vec![0, 2, 3]);

    m.clear(1).expect("reserved");
    assert_eq!(m.clear(1), Err(MaskError::NotReserved(1)));
    assert_eq!(m, ResourceMask::full(4));

    assert_eq!(
        m.set_used(4),
        Err(MaskError::OutOfRange { index: 4, len: 4 })
    );
}

#[test]
fn intersect_only_shrinks_and_rejects_width_mismatch() {
    let mut a = ResourceMask::full(8);
    let mut link = ResourceMask::full(8);
    link.set_used(0).expect("free");
    link.set_used(5).expect("free");
    a.intersect(&link).expect("same width");
    assert_eq!(a.count_available(), 6);
    assert!(!a.is_available(0));
    assert!(!a.is_available(5));

    // 再与满掩码求交不会恢复已去掉的位
    a.intersect(&ResourceMask::full(8)).expect("same width");
    assert_eq!(a.count_available(), 6);

    assert_eq!(
        a.intersect(&ResourceMask::full(16)),
        Err(MaskError::WidthMismatch { left: 8, right: 16 })
    );
}

#[test]
fn label_set_picks_by_preference_order() {
    let mut ls = LabelSet::with_order(4, vec![3, 1, 0, 2]);
    assert_eq!(ls.first_available(), Some(3));

    let mut link = ResourceMask::full(4);
    link.set_used(3).expect("free");
    ls.intersect(&link).expect("same width");
    assert_eq!(ls.first_available(), Some(1));

    link.set_used(1).expect("free");
    link.set_used(0).expect("free");
    link.set_used(2).expect("free");
    ls.intersect(&link).expect("same width");
    assert!(ls.is_empty());
    assert_eq!(ls.first_available(), None);

    assert_eq!(LabelSet::full(3).first_available(), Some(0));
}
