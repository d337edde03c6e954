use std::sync::mpsc;

use anyhow::anyhow;

use tether_sim::Simulation;
use tether_tsi::command::Parser;
use tether_tsi::config::SessionConfig;
use tether_tsi::{Command, Error, HostState, Session};

const DRAM: u64 = 0x8000_0000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_reset_and_start_program() {
    init_logging();
    let mut session = Session::new(|host| {
        host.reset()?;
        host.start_program()?;
        Ok(())
    }).expect("failed to build session");

    assert!(!session.target().is_live());
    session.run().expect("session failed");

    assert!(session.target().is_live());
    assert!(session.target().started(0));
    assert!(!session.target().started(1));
    assert_eq!(session.target().stats().writes, 3);
}

#[test]
fn test_write_read_round_trip() {
    init_logging();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(move |host| {
        let payload: Vec<u32> = (0..32).map(|i| 0x0101_0101 * i).collect();
        host.write_chunk(DRAM + 0x100, payload.len() * 4, &payload)?;
        let data = host.read_chunk(DRAM + 0x100, payload.len() * 4)?;
        tx.send((payload, data))?;
        Ok(())
    }).expect("failed to build session");
    let mut inbound = session.inbound_logger();

    session.run().expect("session failed");
    let (payload, data) = rx.recv().expect("host never reported");
    assert_eq!(payload, data);
    inbound.collect_pending();
    assert_eq!(inbound.words(), payload);
    assert_eq!(session.tsi().state(), HostState::Finished);
}

#[test]
fn test_byte_access() {
    init_logging();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(move |host| {
        host.write_u64(DRAM, 0x1122_3344_5566_7788)?;
        // unaligned write in the middle of the two words
        host.write_bytes(DRAM + 3, &[0xaa, 0xbb])?;
        let bytes = host.read_bytes(DRAM + 1, 6)?;
        let word = host.read_u32(DRAM + 4)?;
        let empty = host.read_bytes(DRAM + 2, 0)?;
        tx.send((bytes, word, empty))?;
        Ok(())
    }).expect("failed to build session");

    session.run().expect("session failed");
    let (bytes, word, empty) = rx.recv().expect("host never reported");
    assert_eq!(bytes, [0x77, 0x66, 0xaa, 0xbb, 0x33, 0x22]);
    assert_eq!(word, 0x1122_33bb);
    assert!(empty.is_empty());
}

#[test]
fn test_large_writes_are_split() {
    init_logging();
    let config = SessionConfig::from_str("tsi:\n  chunk_max_size: 64\n")
        .expect("failed to parse config");
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new_with(&config, move |host| {
        let image: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        host.write_bytes(DRAM + 0x1000, &image)?;
        tx.send(host.read_bytes(DRAM + 0x1000, image.len())? == image)?;
        Ok(())
    }).expect("failed to build session");

    session.run().expect("session failed");
    assert!(rx.recv().expect("host never reported"));
    // 200 bytes in 64 byte chunks
    assert_eq!(session.target().stats().writes, 4);
    assert_eq!(session.target().stats().reads, 4);
}

#[test]
fn test_outbound_log_matches_encoding() {
    init_logging();
    let mut session = Session::new(|host| {
        host.write_chunk(DRAM, 4, &[0x5a5a_5a5a])?;
        host.yield_to_target()?;
        host.write_chunk(DRAM + 4, 4, &[0xa5a5_a5a5])?;
        Ok(())
    }).expect("failed to build session");
    let mut logger = session.outbound_logger();

    session.run().expect("session failed");
    logger.collect_pending();

    let commands = Parser::parse_all(logger.words()).expect("failed to parse outbound stream");
    assert_eq!(commands, vec![
        Command::Write { address: DRAM, data: vec![0x5a5a_5a5a] },
        Command::Write { address: DRAM + 4, data: vec![0xa5a5_a5a5] },
    ]);
}

#[test]
fn test_host_error_stops_session() {
    init_logging();
    let mut session = Session::new(|host| {
        host.yield_to_target()?;
        Err(anyhow!("host gave up"))
    }).expect("failed to build session");

    assert!(session.step().is_err());
    assert_eq!(session.tsi().state(), HostState::Failed);
    assert!(session.step().is_err());
}

#[test]
fn test_malformed_request_is_rejected() {
    init_logging();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(move |host| {
        let unaligned = host.write_chunk(DRAM, 6, &[0, 0]);
        let mismatched = host.write_chunk(DRAM, 8, &[0]);
        let bad_hart = host.send_ipi(64);
        tx.send((
            matches!(unaligned, Err(Error::UnalignedSize(6, 4))),
            matches!(mismatched, Err(Error::PayloadLength { expected: 2, found: 1 })),
            matches!(bad_hart, Err(Error::Hart(64, 16))),
            host.queues().is_drained(),
        ))?;
        Ok(())
    }).expect("failed to build session");

    session.run().expect("session failed");
    assert_eq!(rx.recv().expect("host never reported"), (true, true, true, true));
    assert_eq!(session.clock().now(), 0);
}

#[test]
fn test_run_for_stops_when_quiescent() {
    init_logging();
    let mut session = Session::new(|host| {
        host.write_chunk(DRAM, 4, &[1])?;
        Ok(())
    }).expect("failed to build session");

    let taken = session.run_for(1000).expect("session failed");
    // six words cross the link, the last is consumed in the same step
    assert_eq!(taken, 6);
    assert!(session.is_quiescent());
    assert_eq!(session.target().memory().read_word(DRAM).unwrap(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    init_logging();
    let mut config = SessionConfig::default();
    config.tsi.chunk_align = 12;
    let err = Session::new_with(&config, |_| Ok(())).err().expect("config should be rejected");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));
}

#[test]
fn test_dropped_logger_does_not_stop_session() {
    init_logging();
    let mut session = Session::new(|host| {
        host.write_chunk(DRAM, 8, &[3, 4])?;
        Ok(())
    }).expect("failed to build session");
    drop(session.outbound_logger());
    drop(session.inbound_logger());

    session.run().expect("session failed");
    assert!(session.is_quiescent());
    assert_eq!(session.target().memory().read_word(DRAM + 4).unwrap(), 4);
}

