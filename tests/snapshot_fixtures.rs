mod common;

use common::ProcFixture;
use memstat::flags::PageFlags;
use memstat::summary::Summary;
use memstat::{Snapshot, PAGE_SIZE};

const PM_PRESENT: u64 = 1 << 63;
const PM_SOFT_DIRTY: u64 = 1 << 55;

#[test]
fn single_anonymous_region() {
    let fixture = ProcFixture::new("single-anon");
    fixture.write_maps("00001000-00002000 rw-p 00000000 00:00 0\n");
    fixture.write_words("pagemap", &[(1, PM_PRESENT | 0x123)]);
    fixture.write_words("kpagecount", &[(0x123, 1)]);
    fixture.write_words("kpageflags", &[(0x123, 1 << 5)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);

    assert_eq!(snapshot.regions.len(), 1);
    let region = &snapshot.regions[0];
    assert_eq!((region.start, region.end), (0x1000, 0x2000));
    assert_eq!(region.backing_file, "");
    assert_eq!(region.use_counts, vec![1]);
    assert_eq!(region.combined_flags, vec![0x8000_0020]);
}

#[test]
fn summary_over_two_shared_regions() {
    let fixture = ProcFixture::new("two-shared");
    fixture.write_maps(concat!(
        "00001000-00002000 rw-p 00000000 00:00 0\n",
        "00003000-00004000 rw-p 00000000 00:00 0\n",
    ));
    fixture.write_words("pagemap", &[(1, PM_PRESENT | 1), (3, PM_PRESENT | 2)]);
    fixture.write_words("kpagecount", &[(1, 2), (2, 3)]);
    fixture.write_words("kpageflags", &[(2, 0)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    let summary = Summary::compute(&snapshot);

    assert_eq!(summary.virtual_size, 8192);
    assert_eq!(summary.resident, 8192);
    assert_eq!(summary.proportional, PAGE_SIZE / 2 + PAGE_SIZE / 3);
    assert_eq!(summary.zero_use_count_pages, 0);
}

#[test]
fn soft_dirty_maps_to_bit_28() {
    let fixture = ProcFixture::new("soft-dirty");
    fixture.write_maps("00001000-00002000 rw-p 00000000 00:00 0\n");
    fixture.write_words("pagemap", &[(1, PM_PRESENT | PM_SOFT_DIRTY | 0x42)]);
    fixture.write_words("kpagecount", &[(0x42, 1)]);
    fixture.write_words("kpageflags", &[(0x42, 0)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    let flags = PageFlags::from_bits_retain(snapshot.regions[0].combined_flags[0]);

    assert!(flags.contains(PageFlags::SOFT_DIRTY));
    assert!(flags.contains(PageFlags::PRESENT));
}

#[test]
fn backing_file_is_carried_through() {
    let fixture = ProcFixture::new("backing-file");
    fixture.write_maps("00001000-00003000 r-xp 00000000 08:02 1048603 /lib/x.so\n");
    fixture.write_words("pagemap", &[(1, PM_PRESENT | 0x10), (2, PM_PRESENT | 0x11)]);
    fixture.write_words("kpagecount", &[(0x10, 4), (0x11, 4)]);
    fixture.write_words("kpageflags", &[(0x10, 1 << 11), (0x11, 1 << 11)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    let region = &snapshot.regions[0];

    assert_eq!(region.backing_file, "/lib/x.so");
    assert_eq!(region.use_counts, vec![4, 4]);
    assert_eq!(region.combined_flags, vec![0x8000_0800, 0x8000_0800]);
}

#[test]
fn unreadable_pagemap_yields_an_empty_snapshot() {
    let fixture = ProcFixture::new("no-pagemap");
    fixture.write_maps("00001000-00002000 rw-p 00000000 00:00 0\n");
    // no pagemap file at all, like an EPERM open failure

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    assert!(snapshot.regions.is_empty());
}

#[test]
fn vanished_process_yields_an_empty_snapshot() {
    let fixture = ProcFixture::new("gone");
    let snapshot = Snapshot::capture_at(&fixture.root, 31337);
    assert!(snapshot.regions.is_empty());
}

#[test]
fn unreadable_frame_files_zero_the_frame_attributes() {
    let fixture = ProcFixture::new("no-kpage");
    fixture.write_maps("00001000-00002000 rw-p 00000000 00:00 0\n");
    fixture.write_words("pagemap", &[(1, PM_PRESENT | 0x123)]);
    // neither kpagecount nor kpageflags exists

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    let region = &snapshot.regions[0];

    assert_eq!(region.use_counts, vec![0]);
    // the pagemap-sourced bits survive, the frame bits read as zero
    assert_eq!(region.combined_flags, vec![0x8000_0000]);
}

#[test]
fn short_pagemap_read_leaves_tail_pages_absent() {
    let fixture = ProcFixture::new("short-read");
    // three pages mapped, but the pagemap file ends after the second entry
    fixture.write_maps("00001000-00004000 rw-p 00000000 00:00 0\n");
    fixture.write_words("pagemap", &[(1, PM_PRESENT | 0x50)]);
    fixture.write_words("kpagecount", &[(0x50, 1)]);
    fixture.write_words("kpageflags", &[(0x50, 0)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);
    let region = &snapshot.regions[0];

    assert_eq!(region.use_counts, vec![1, 0, 0]);
    assert_eq!(region.combined_flags[0], 0x8000_0000);
    assert_eq!(region.combined_flags[1], 0);
    assert_eq!(region.combined_flags[2], 0);
}

#[test]
fn overlapping_kernel_reports_are_corrected() {
    let fixture = ProcFixture::new("overlap");
    fixture.write_maps(concat!(
        "00001000-00003000 rw-p 00000000 00:00 0\n",
        "00002000-00004000 rw-p 00000000 00:00 0\n",
    ));
    fixture.write_words(
        "pagemap",
        &[
            (1, PM_PRESENT | 0x10),
            (2, PM_PRESENT | 0x11),
            (3, PM_PRESENT | 0x12),
        ],
    );
    fixture.write_words("kpagecount", &[(0x10, 1), (0x11, 1), (0x12, 1)]);
    fixture.write_words("kpageflags", &[(0x12, 0)]);

    let snapshot = Snapshot::capture_at(&fixture.root, fixture.pid);

    assert_eq!(snapshot.regions.len(), 2);
    assert_eq!(
        (snapshot.regions[0].start, snapshot.regions[0].end),
        (0x1000, 0x3000)
    );
    assert_eq!(
        (snapshot.regions[1].start, snapshot.regions[1].end),
        (0x3000, 0x4000)
    );
    assert_eq!(snapshot.regions[1].use_counts.len(), 1);
    for pair in snapshot.regions.windows(2) {
        assert!(pair[1].start >= pair[0].end);
    }
}
