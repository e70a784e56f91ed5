//! 루프백 UDP 종단간 전송 테스트
//!
//! 실제 소켓으로 서버 태스크를 띄우고 클라이언트가 내려받은 파일을
//! 원본과 바이트 단위로 비교한다.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::UdpSocket;

use gbn::{
    Admission, Config, Error, ImpairmentConfig, Receiver, ReassemblyState, Segmenter, Sender,
    SessionState, MAX_PAYLOAD, WINDOW_MOD,
};

/// 서버 태스크를 띄우고 주소를 반환
async fn start_server(
    root: PathBuf,
    config: Config,
    impairment: ImpairmentConfig,
    seed: Option<u64>,
) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let mut sender = match seed {
        Some(seed) => Sender::seeded(root, config, impairment, seed).unwrap(),
        None => Sender::new(root, config, impairment).unwrap(),
    };

    tokio::spawn(async move {
        let _ = sender.serve(&socket).await;
    });

    addr
}

async fn fetch_file(
    server_addr: SocketAddr,
    filename: &str,
    out_dir: &Path,
) -> gbn::Result<PathBuf> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    Receiver::new(Config::local_test())
        .fetch(&socket, server_addr, filename, out_dir)
        .await
}

#[tokio::test]
async fn test_transfer_1200_bytes_no_impairment() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // 0 바이트와 0x80 이상 바이트를 포함하는 1200바이트
    let original: Vec<u8> = (0..1200u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(root.path().join("data.bin"), &original).unwrap();

    let addr = start_server(
        root.path().to_path_buf(),
        Config::local_test(),
        ImpairmentConfig::default(),
        None,
    )
    .await;

    let dest = fetch_file(addr, "data.bin", out.path()).await.unwrap();

    assert_eq!(dest.file_name().unwrap(), "recv_data.bin");
    assert_eq!(std::fs::read(&dest).unwrap(), original);
}

#[tokio::test]
async fn test_transfer_empty_file() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    std::fs::write(root.path().join("empty.bin"), b"").unwrap();

    let addr = start_server(
        root.path().to_path_buf(),
        Config::local_test(),
        ImpairmentConfig::default(),
        None,
    )
    .await;

    let dest = fetch_file(addr, "empty.bin", out.path()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_missing_file_then_valid_get() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = vec![0x5Au8; 900];
    std::fs::write(root.path().join("present.bin"), &original).unwrap();

    let addr = start_server(
        root.path().to_path_buf(),
        Config::local_test(),
        ImpairmentConfig::default(),
        None,
    )
    .await;

    // 없는 파일은 ERR로 끝남
    let err = fetch_file(addr, "absent.bin", out.path()).await.unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));

    // 서버는 죽지 않고 다음 GET을 처리함
    let dest = fetch_file(addr, "present.bin", out.path()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), original);
}

#[test]
fn test_single_corruption_one_nak_then_identical_content() {
    // 소켓 없이 두 상태 기계를 직접 맞물린다: 슬롯 2의 프레임 하나만
    // 체크섬을 망가뜨려 NAK 한 번과 재전송을 확인
    let original: Vec<u8> = (0..1200u32).map(|i| (i % 256) as u8).collect();
    let mut session = SessionState::new(Segmenter::new().segment(&original));
    let mut state = ReassemblyState::new();
    let mut naks = 0;

    while !session.is_complete() {
        let mut frame = session.packets[session.cursor].clone();
        let first_delivery_of_2 = frame.sequence == 2 && naks == 0;
        if first_delivery_of_2 {
            frame.checksum = frame.checksum.wrapping_add(1);
        }

        match state.admit(&frame) {
            Admission::Accepted { ack_slot } => session.on_ack(ack_slot),
            Admission::Rejected { nak_slot, .. } => {
                assert!(first_delivery_of_2);
                assert_eq!(nak_slot, 2);
                naks += 1;
                session.on_nak(nak_slot);
            }
        }
    }

    assert_eq!(naks, 1);
    assert_eq!(state.finalize(), original);
}

#[test]
fn test_lost_final_ack_recovers_via_nak() {
    // 마지막 프레임의 ACK가 유실되면 송신자는 타임아웃으로 같은 프레임을
    // 재전송하고, 수신자는 이미 다음 슬롯을 기대하므로 NAK으로 답한다.
    // 그 NAK의 절대 인덱스는 정확히 계획 길이 — 완료로 이어져야 하고,
    // 무시하면 재전송과 NAK이 영원히 반복된다
    let original: Vec<u8> = (0..1200u32).map(|i| (i % 256) as u8).collect();
    let mut session = SessionState::new(Segmenter::new().segment(&original));
    let mut state = ReassemblyState::new();
    let mut dropped_final_ack = false;
    let mut steps = 0;

    while !session.is_complete() {
        steps += 1;
        assert!(steps < 100, "송신자가 완료되지 않음: cursor={}", session.cursor);

        let frame = session.packets[session.cursor].clone();
        match state.admit(&frame) {
            Admission::Accepted { ack_slot } => {
                let is_final_ack = ack_slot as usize == session.packets.len();
                if is_final_ack && !dropped_final_ack {
                    dropped_final_ack = true;
                    session.on_timeout();
                } else {
                    session.on_ack(ack_slot);
                }
            }
            Admission::Rejected { nak_slot, .. } => session.on_nak(nak_slot),
        }
    }

    assert!(dropped_final_ack);
    assert_eq!(state.finalize(), original);
}

#[tokio::test]
async fn test_transfer_across_slot_wraparound_with_corruption() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // WINDOW_MOD를 넘는 프레임 수로 슬롯 랩어라운드를 통과시킨다
    let frame_count = WINDOW_MOD + 10;
    let original: Vec<u8> = (0..frame_count * MAX_PAYLOAD)
        .map(|i| (i % 251) as u8)
        .collect();
    std::fs::write(root.path().join("big.bin"), &original).unwrap();

    let impairment = ImpairmentConfig {
        corrupt: 0.2,
        ..ImpairmentConfig::default()
    };

    let addr = start_server(
        root.path().to_path_buf(),
        Config::local_test(),
        impairment,
        Some(42),
    )
    .await;

    let dest = fetch_file(addr, "big.bin", out.path()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), original);
}

#[tokio::test]
async fn test_transfer_with_loss_and_delay() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original: Vec<u8> = (0..30 * MAX_PAYLOAD).map(|i| (i % 253) as u8).collect();
    std::fs::write(root.path().join("lossy.bin"), &original).unwrap();

    let impairment = ImpairmentConfig {
        loss: 0.1,
        delay: 0.1,
        delay_hold_ms: 2,
        ..ImpairmentConfig::default()
    };

    let addr = start_server(
        root.path().to_path_buf(),
        Config::local_test(),
        impairment,
        Some(7),
    )
    .await;

    let dest = fetch_file(addr, "lossy.bin", out.path()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), original);
}
