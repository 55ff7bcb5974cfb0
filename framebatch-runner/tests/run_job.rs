//! End-to-end job runs against an in-memory store and a closure routine,
//! on a real on-disk cache.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use framebatch_core::queue::MemoryStore;
use framebatch_core::types::{AcqDate, FrameId, ItemId, ItemStatus, JobId, MultiLook, SourceId};
use framebatch_core::Settings;
use framebatch_runner::{CoregRequest, FnRoutine, LogReporter, Orchestrator, ProgressReporter};
use tempfile::TempDir;

const JOB: JobId = JobId(7);
const ITEM: ItemId = ItemId(1);
const SOURCE: SourceId = SourceId(11);

fn date(s: &str) -> AcqDate {
    AcqDate::parse_compact(s).expect("date")
}

/// Minimal frame cache: primary reference (raw + co-registered), shared
/// geometry, and the target's raw acquisition.
fn seed_cache(cache: &Path) -> FrameId {
    let _ = env_logger::builder().is_test(true).try_init();
    let frame = FrameId::parse("021D_04972_131313").expect("frame");
    let frame_dir = cache.join(frame.name());

    let primary_slc = frame_dir.join("SLC/20200101");
    fs::create_dir_all(&primary_slc).expect("primary SLC");
    fs::write(
        primary_slc.join("20200101.slc.mli.par"),
        "title: mli parameters\nrange_looks:          20\nazimuth_looks:         4\n",
    )
    .expect("par");
    fs::write(primary_slc.join("20200101.slc"), b"raw-primary").expect("slc");

    let primary_rslc = frame_dir.join("RSLC/20200101");
    fs::create_dir_all(&primary_rslc).expect("primary RSLC");
    fs::write(primary_rslc.join("20200101.rslc"), b"resampled-primary").expect("rslc");

    fs::create_dir_all(frame_dir.join("geo")).expect("geo");
    fs::write(frame_dir.join("geo/20200101.lt"), b"lookup").expect("lt");
    fs::create_dir_all(frame_dir.join("DEM")).expect("DEM");
    fs::write(frame_dir.join("DEM/dem.tif"), b"heights").expect("dem");

    let target_slc = frame_dir.join("SLC/20200110");
    fs::create_dir_all(&target_slc).expect("target SLC");
    fs::write(target_slc.join("20200110.IW1.slc"), b"raw-target").expect("slc");

    frame
}

fn settings_for(cache: &TempDir, temp: &TempDir) -> Settings {
    let mut settings = Settings::new(cache.path());
    settings.temp_root = temp.path().to_path_buf();
    settings.threads = 2;
    settings
}

struct Recorder(std::cell::RefCell<Vec<String>>);

impl ProgressReporter for Recorder {
    fn report(&self, message: &str) {
        self.0.borrow_mut().push(message.to_owned());
    }
}

#[test]
fn successful_item_builds_writes_back_and_reclaims_the_source() {
    let cache = TempDir::new().expect("cache");
    let temp = TempDir::new().expect("temp");
    let frame = seed_cache(cache.path());
    let frame_dir = cache.path().join(frame.name());

    let store = MemoryStore::new(JOB, frame, date("20200101"));
    store.push_item(ITEM, date("20200110"), Some(SOURCE));
    store.push_source(SOURCE, date("20200110"));

    let routine = FnRoutine(|req: &CoregRequest<'_>| -> i32 {
        assert_eq!(req.looks, MultiLook { range: 20, azimuth: 4 });
        assert_eq!(req.auxiliary, None);
        assert_eq!(req.threads, 2);
        // Staged inputs are visible from the working directory.
        assert!(req.work_dir.join("SLC/20200110/20200110.IW1.slc").is_file());
        assert!(req.work_dir.join("RSLC/20200101/20200101.rslc").is_file());
        assert!(req.work_dir.join("DEM/dem.tif").is_file());
        assert!(req.work_dir.join("tab").is_dir());

        let out = req.work_dir.join("RSLC/20200110");
        fs::create_dir_all(&out).expect("out dir");
        fs::write(out.join("20200110.rslc.par"), b"par").expect("par");
        fs::write(out.join("20200110.IW1.rslc"), b"swath").expect("swath");
        fs::write(out.join("20200110.rslc"), b"mosaic").expect("mosaic");
        fs::write(out.join("20200101_20200110.off"), b"offsets").expect("off");
        fs::write(req.work_dir.join("log/coreg.log"), b"done").expect("log");
        0
    });
    let reporter = Recorder(std::cell::RefCell::new(Vec::new()));
    let settings = settings_for(&cache, &temp);

    let summary = Orchestrator::new(&store, &routine, &reporter, &settings)
        .run_job(JOB)
        .expect("run");

    assert!(summary.all_built());
    assert_eq!(store.item_status(ITEM), Some(ItemStatus::Built));
    assert_eq!(
        store.history(),
        vec![(ITEM, ItemStatus::Building), (ITEM, ItemStatus::Built)]
    );
    assert!(store.started());
    assert_eq!(store.finished(), Some(3));

    // Declared outputs landed in the cache; the mosaic did not.
    let out = frame_dir.join("RSLC/20200110");
    assert!(out.join("20200110.rslc.par").is_file());
    assert!(out.join("20200110.IW1.rslc").is_file());
    assert!(out.join("20200101_20200110.off").is_file());
    assert!(!out.join("20200110.rslc").exists());
    assert!(frame_dir.join("log/coreg.log").is_file());

    // Nobody else needs the raw target any more.
    assert!(!frame_dir.join("SLC/20200110").exists());
    assert_eq!(store.source_status(SOURCE), Some(ItemStatus::Removed));

    // The staging directory is gone.
    let env_root = temp.path().join(format!("{}_envs", frame_dir.file_name().unwrap().to_string_lossy()));
    assert!(!env_root.join("7").exists());

    assert_eq!(
        reporter.0.borrow().as_slice(),
        [
            "Setting up 20200110",
            "Processing 20200110",
            "Cleaning 20200110"
        ]
    );
}

#[test]
fn failed_routine_reports_the_exit_code_and_keeps_the_cache_clean() {
    let cache = TempDir::new().expect("cache");
    let temp = TempDir::new().expect("temp");
    let frame = seed_cache(cache.path());
    let frame_dir = cache.path().join(frame.name());

    let store = MemoryStore::new(JOB, frame, date("20200101"));
    store.push_item(ITEM, date("20200110"), Some(SOURCE));
    store.push_source(SOURCE, date("20200110"));

    let routine = FnRoutine(|req: &CoregRequest<'_>| -> i32 {
        let out = req.work_dir.join("RSLC/20200110");
        fs::create_dir_all(&out).expect("out dir");
        fs::write(out.join("20200110.partial"), b"half-written").expect("partial");
        4
    });
    let reporter = LogReporter;
    let settings = settings_for(&cache, &temp);

    let summary = Orchestrator::new(&store, &routine, &reporter, &settings)
        .run_job(JOB)
        .expect("run");

    assert!(!summary.all_built());
    assert_eq!(summary.failures(), 1);
    assert_eq!(store.item_status(ITEM), Some(ItemStatus::Failed(4)));
    // The failure hook fires during release, then the exit code lands.
    assert_eq!(
        store.history(),
        vec![
            (ITEM, ItemStatus::Building),
            (ITEM, ItemStatus::UnknownError),
            (ITEM, ItemStatus::Failed(4)),
        ]
    );
    assert_eq!(store.finished(), Some(3));

    // Partial products were purged before write-back.
    assert!(!frame_dir.join("RSLC/20200110").exists());
    // The source acquisition is untouched.
    assert!(frame_dir.join("SLC/20200110/20200110.IW1.slc").is_file());
    assert_eq!(store.source_status(SOURCE), None);
}

#[test]
fn missing_source_is_terminal_without_staging_anything() {
    let cache = TempDir::new().expect("cache");
    let temp = TempDir::new().expect("temp");
    let frame = seed_cache(cache.path());
    let env_root = temp.path().join(format!("{}_envs", frame.name()));

    let store = MemoryStore::new(JOB, frame, date("20200101"));
    store.push_item(ITEM, date("20200301"), None);

    let invocations = Cell::new(0u32);
    let routine = FnRoutine(|_: &CoregRequest<'_>| -> i32 {
        invocations.set(invocations.get() + 1);
        0
    });
    let reporter = LogReporter;
    let settings = settings_for(&cache, &temp);

    let summary = Orchestrator::new(&store, &routine, &reporter, &settings)
        .run_job(JOB)
        .expect("run");

    assert_eq!(invocations.get(), 0);
    assert_eq!(summary.statuses, vec![(ITEM, ItemStatus::MissingSource)]);
    assert_eq!(store.item_status(ITEM), Some(ItemStatus::MissingSource));
    assert_eq!(store.history(), vec![(ITEM, ItemStatus::MissingSource)]);
    assert!(!env_root.exists());
    assert_eq!(store.finished(), Some(3));
}

#[test]
fn closest_staged_reference_is_offered_as_auxiliary() {
    let cache = TempDir::new().expect("cache");
    let temp = TempDir::new().expect("temp");
    let frame = seed_cache(cache.path());
    let frame_dir = cache.path().join(frame.name());

    // A second co-registered date sits closer to the target than the primary.
    let aux_rslc = frame_dir.join("RSLC/20200105");
    fs::create_dir_all(&aux_rslc).expect("aux RSLC");
    fs::write(aux_rslc.join("20200105.rslc"), b"resampled-aux").expect("rslc");

    let store = MemoryStore::new(JOB, frame, date("20200101"));
    store.push_item(ITEM, date("20200110"), None);

    let routine = FnRoutine(|req: &CoregRequest<'_>| -> i32 {
        assert_eq!(req.auxiliary, Some(date("20200105")));
        assert!(req.work_dir.join("RSLC/20200105/20200105.rslc").is_file());
        let out = req.work_dir.join("RSLC/20200110");
        fs::create_dir_all(&out).expect("out dir");
        fs::write(out.join("20200110.rslc.par"), b"par").expect("par");
        0
    });
    let reporter = LogReporter;
    let settings = settings_for(&cache, &temp);

    let summary = Orchestrator::new(&store, &routine, &reporter, &settings)
        .run_job(JOB)
        .expect("run");

    assert!(summary.all_built());
    assert!(frame_dir.join("RSLC/20200110/20200110.rslc.par").is_file());
}
