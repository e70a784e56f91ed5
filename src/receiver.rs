//! 수신자 조립기 (클라이언트측)
//!
//! - 기대 슬롯과 일치하는 프레임만 수락 (순서 밖 버퍼링 없음)
//! - 프레임마다 ACK/NAK 응답으로 송신자 커서를 구동
//! - 종료 프레임 후 시퀀스 정렬과 재조립

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::channel::recv_datagram;
use crate::frame::{DataFrame, Frame};
use crate::message::ControlFrame;
use crate::stats::TransferStats;
use crate::{Config, Error, Result, WINDOW_MOD};

/// 프레임 하나에 대한 수락 판정
#[derive(Debug)]
pub enum Admission {
    /// 수락: 응답으로 보낼 ACK 슬롯 (증가 후의 기대 슬롯)
    Accepted { ack_slot: u8 },

    /// 거절: 응답으로 보낼 NAK 슬롯 (현재 기대 슬롯)과 원인
    Rejected { nak_slot: u8, cause: Error },
}

/// 재조립 상태 (세션 하나당 한 개)
#[derive(Debug)]
pub struct ReassemblyState {
    /// 다음에 수락할 슬롯 번호 (수락마다 WINDOW_MOD 모듈러로 +1)
    pub expected_slot: u8,

    /// 수락된 (시퀀스, 페이로드) — 시퀀스 기준 정렬 유지
    collected: Vec<(u32, Bytes)>,
}

impl ReassemblyState {
    pub fn new() -> Self {
        Self {
            expected_slot: 0,
            collected: Vec::new(),
        }
    }

    /// 수락된 프레임 수
    pub fn frame_count(&self) -> usize {
        self.collected.len()
    }

    /// 인바운드 데이터 프레임 판정
    ///
    /// 슬롯이 기대값과 다르거나 체크섬이 어긋나면 상태 변화 없이
    /// 거절한다. 수락 시 시퀀스를 키로 삽입하는데, ACK 유실로 송신자가
    /// 되감긴 경우 같은 시퀀스가 다시 올 수 있으므로 중복은 교체한다
    /// (재수락이 멱등).
    pub fn admit(&mut self, frame: &DataFrame) -> Admission {
        let slot = frame.slot();
        if slot != self.expected_slot {
            return Admission::Rejected {
                nak_slot: self.expected_slot,
                cause: Error::SequenceMismatch {
                    expected: self.expected_slot as u32,
                    got: slot as u32,
                },
            };
        }

        // 엄격한 순서 수락 아래에서 시퀀스는 (지금까지의 최대 + 1)을
        // 넘을 수 없다. 체크섬은 페이로드만 덮으므로, 시퀀스 필드가
        // 슬롯을 보존하는 방식으로 손상되면 (64의 배수만큼 변하면)
        // 이 검사가 마지막 방어선이다.
        let next_sequence = self.collected.last().map_or(0, |(seq, _)| seq + 1);
        if frame.sequence > next_sequence {
            return Admission::Rejected {
                nak_slot: self.expected_slot,
                cause: Error::SequenceMismatch {
                    expected: next_sequence,
                    got: frame.sequence,
                },
            };
        }

        if let Err(cause) = frame.verify() {
            return Admission::Rejected {
                nak_slot: self.expected_slot,
                cause,
            };
        }

        match self
            .collected
            .binary_search_by_key(&frame.sequence, |(seq, _)| *seq)
        {
            Ok(idx) => self.collected[idx].1 = frame.payload.clone(),
            Err(idx) => self.collected.insert(idx, (frame.sequence, frame.payload.clone())),
        }

        self.expected_slot = ((self.expected_slot as usize + 1) % WINDOW_MOD) as u8;
        Admission::Accepted {
            ack_slot: self.expected_slot,
        }
    }

    /// 재조립 마무리: 시퀀스 오름차순 정렬 후 페이로드 연결
    ///
    /// 수락 순서가 이미 오름차순을 보장하지만, 수락 규칙이 나중에
    /// 느슨해져도 깨지지 않도록 안정 정렬을 거친다.
    pub fn finalize(mut self) -> Vec<u8> {
        self.collected.sort_by_key(|(seq, _)| *seq);

        let total: usize = self.collected.iter().map(|(_, p)| p.len()).sum();
        let mut out = Vec::with_capacity(total);
        for (_, payload) in &self.collected {
            out.extend_from_slice(payload);
        }
        out
    }
}

impl Default for ReassemblyState {
    fn default() -> Self {
        Self::new()
    }
}

/// 수신자
pub struct Receiver {
    config: Config,
}

impl Receiver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 파일 하나를 내려받아 `out_dir` 아래에 저장하고 경로를 반환
    ///
    /// 요청 경로는 마지막 구성 요소만 남기고 `recv_` 접두를 붙여
    /// 목적지 이름으로 쓴다 — 요청자가 보낸 경로가 출력 디렉터리를
    /// 벗어날 수 없다.
    pub async fn fetch(
        &self,
        socket: &UdpSocket,
        server_addr: SocketAddr,
        filename: &str,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let dest = out_dir.join(destination_name(filename)?);

        self.handshake(socket, server_addr, filename).await?;

        let mut state = ReassemblyState::new();
        let mut stats = TransferStats::new();
        let mut consecutive_timeouts = 0u32;
        let timeout = Duration::from_millis(self.config.recv_timeout_ms);
        let mut buf = vec![0u8; crate::SEGMENT_SIZE];

        loop {
            match recv_datagram(socket, &mut buf, timeout).await {
                Ok((len, _from)) => {
                    consecutive_timeouts = 0;
                    match Frame::from_bytes(&buf[..len]) {
                        Ok(Frame::Terminator) => break,
                        Ok(Frame::Data(frame)) => match state.admit(&frame) {
                            Admission::Accepted { ack_slot } => {
                                stats.frames_accepted += 1;
                                stats.acks += 1;
                                stats.total_bytes += frame.payload.len() as u64;
                                socket
                                    .send_to(&ControlFrame::Ack(ack_slot).to_bytes(), server_addr)
                                    .await?;
                            }
                            Admission::Rejected { nak_slot, cause } => {
                                debug!("프레임 거절: seq={} ({})", frame.sequence, cause);
                                stats.naks += 1;
                                socket
                                    .send_to(&ControlFrame::Nak(nak_slot).to_bytes(), server_addr)
                                    .await?;
                            }
                        },
                        Err(e) => {
                            // 손상이라 분류조차 못한 데이터그램도 체크섬
                            // 불일치와 동일하게 취급한다
                            debug!("손상 데이터그램: {}", e);
                            stats.naks += 1;
                            socket
                                .send_to(
                                    &ControlFrame::Nak(state.expected_slot).to_bytes(),
                                    server_addr,
                                )
                                .await?;
                        }
                    }
                }
                Err(Error::ChannelTimeout) => {
                    // 재전송은 송신자의 타임아웃 정책이 이끈다.
                    // 수신자는 기다리기만 하고, 연속 한도에서만 중단한다.
                    stats.timeouts += 1;
                    consecutive_timeouts += 1;
                    if consecutive_timeouts >= self.config.max_consecutive_timeouts {
                        return Err(Error::TransferAborted {
                            timeouts: consecutive_timeouts,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let data = state.finalize();
        tokio::fs::write(&dest, &data).await?;

        info!("수신 완료: {:?} ({} bytes) | {}", dest, data.len(), stats.summary());
        Ok(dest)
    }

    /// GET → ACK/ERR 핸드쉐이크 (응답 없으면 GET 재전송)
    async fn handshake(
        &self,
        socket: &UdpSocket,
        server_addr: SocketAddr,
        filename: &str,
    ) -> Result<()> {
        let get = ControlFrame::Get(filename.to_string()).to_bytes();
        let interval = Duration::from_millis(self.config.handshake_retry_interval_ms);
        let mut buf = vec![0u8; crate::SEGMENT_SIZE];

        for attempt in 0..self.config.handshake_retries {
            if attempt > 0 {
                info!("핸드쉐이크 재시도 #{}", attempt);
            }
            socket.send_to(&get, server_addr).await?;

            match recv_datagram(socket, &mut buf, interval).await {
                Ok((len, _from)) => match ControlFrame::from_bytes(&buf[..len]) {
                    Ok(ControlFrame::OpenAck) => {
                        info!("세션 개시 승인: {}", filename);
                        return Ok(());
                    }
                    Ok(ControlFrame::OpenErr) => {
                        warn!("서버 응답: 파일 없음 ({})", filename);
                        return Err(Error::FileNotFound {
                            name: filename.to_string(),
                        });
                    }
                    Ok(other) => debug!("핸드쉐이크 중 예상 밖 프레임 무시: {:?}", other),
                    Err(e) => debug!("핸드쉐이크 중 손상 데이터그램 무시: {}", e),
                },
                Err(Error::ChannelTimeout) => {}
                Err(e) => return Err(e),
            }
        }

        Err(Error::HandshakeFailed {
            retries: self.config.handshake_retries,
        })
    }
}

/// 요청 경로를 로컬 목적지 이름으로 변환
///
/// 마지막 경로 구성 요소로 잘라내고 `recv_` 접두를 붙인다.
fn destination_name(filename: &str) -> Result<String> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidFilename {
            name: filename.to_string(),
        })?;
    Ok(format!("recv_{}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::checksum;

    fn frame(sequence: u32, payload: &[u8]) -> DataFrame {
        DataFrame::new(sequence, Bytes::copy_from_slice(payload))
    }

    #[test]
    fn test_in_order_accept_post_increment_ack() {
        let mut state = ReassemblyState::new();

        match state.admit(&frame(0, b"abc")) {
            Admission::Accepted { ack_slot } => assert_eq!(ack_slot, 1),
            other => panic!("수락이어야 함: {:?}", other),
        }
        assert_eq!(state.expected_slot, 1);
        assert_eq!(state.frame_count(), 1);
    }

    #[test]
    fn test_out_of_order_rejected_no_state_change() {
        let mut state = ReassemblyState::new();

        match state.admit(&frame(3, b"xyz")) {
            Admission::Rejected { nak_slot, cause } => {
                assert_eq!(nak_slot, 0);
                assert!(matches!(cause, Error::SequenceMismatch { expected: 0, got: 3 }));
            }
            other => panic!("거절이어야 함: {:?}", other),
        }
        assert_eq!(state.expected_slot, 0);
        assert_eq!(state.frame_count(), 0);
    }

    #[test]
    fn test_slot_preserving_sequence_corruption_rejected() {
        // 시퀀스 상위 바이트 손상은 64의 배수만큼 시퀀스를 바꿔 슬롯이
        // 그대로 맞을 수 있다. 최대 수락 시퀀스 + 1을 넘으면 거절해야 함
        let mut state = ReassemblyState::new();

        // 빈 상태: 슬롯 0이지만 시퀀스 64는 불가능
        match state.admit(&frame(WINDOW_MOD as u32, b"bogus")) {
            Admission::Rejected { nak_slot, cause } => {
                assert_eq!(nak_slot, 0);
                assert!(matches!(cause, Error::SequenceMismatch { expected: 0, got: 64 }));
            }
            other => panic!("거절이어야 함: {:?}", other),
        }

        state.admit(&frame(0, b"a"));
        state.admit(&frame(1, b"b"));

        // 슬롯 2 == 기대 슬롯이지만 시퀀스 2 + 2^24는 계획 밖
        match state.admit(&frame(2 + (1 << 24), b"c")) {
            Admission::Rejected { cause, .. } => {
                assert!(matches!(cause, Error::SequenceMismatch { expected: 2, .. }));
            }
            other => panic!("거절이어야 함: {:?}", other),
        }
        assert_eq!(state.frame_count(), 2);
        assert_eq!(state.expected_slot, 2);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut state = ReassemblyState::new();
        let mut bad = frame(0, b"abc");
        bad.checksum = checksum(&bad.payload).wrapping_add(7);

        match state.admit(&bad) {
            Admission::Rejected { nak_slot, cause } => {
                assert_eq!(nak_slot, 0);
                assert!(matches!(cause, Error::ChecksumMismatch { .. }));
            }
            other => panic!("거절이어야 함: {:?}", other),
        }
        assert_eq!(state.frame_count(), 0);
    }

    #[test]
    fn test_expected_slot_wraps_after_window_mod() {
        let mut state = ReassemblyState::new();
        for seq in 0..WINDOW_MOD as u32 {
            match state.admit(&frame(seq, &[seq as u8])) {
                Admission::Accepted { .. } => {}
                other => panic!("수락이어야 함: {:?}", other),
            }
        }

        assert_eq!(state.expected_slot, 0);

        // 랩 직후 프레임 64의 슬롯은 0
        match state.admit(&frame(WINDOW_MOD as u32, b"w")) {
            Admission::Accepted { ack_slot } => assert_eq!(ack_slot, 1),
            other => panic!("수락이어야 함: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_readmission_idempotent() {
        let mut state = ReassemblyState::new();
        for seq in 0..WINDOW_MOD as u32 {
            state.admit(&frame(seq, &[seq as u8]));
        }
        assert_eq!(state.frame_count(), WINDOW_MOD);

        // ACK(0) 유실로 송신자가 0부터 되감긴 상황: 시퀀스 0이 다시
        // 도착하고 슬롯 0이 기대값과 다시 일치한다
        match state.admit(&frame(0, &[0u8])) {
            Admission::Accepted { ack_slot } => assert_eq!(ack_slot, 1),
            other => panic!("수락이어야 함: {:?}", other),
        }
        assert_eq!(state.frame_count(), WINDOW_MOD);
    }

    #[test]
    fn test_finalize_concatenates_in_sequence_order() {
        let mut state = ReassemblyState::new();
        state.admit(&frame(0, b"hello "));
        state.admit(&frame(1, b"go-back-n "));
        state.admit(&frame(2, b"world"));

        assert_eq!(state.finalize(), b"hello go-back-n world");
    }

    #[test]
    fn test_destination_name_truncates_path() {
        assert_eq!(destination_name("data.bin").unwrap(), "recv_data.bin");
        assert_eq!(destination_name("/etc/passwd").unwrap(), "recv_passwd");
        assert_eq!(destination_name("a/b/c.txt").unwrap(), "recv_c.txt");
        assert!(destination_name("..").is_err());
        assert!(destination_name("").is_err());
    }
}
