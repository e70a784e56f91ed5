//! 송신자 ARQ 엔진 (서버측)
//!
//! - 윈도우 기반 송신과 ACK/NAK 해석
//! - 타임아웃 시 커서 프레임 재전송 (침묵이 데이터를 건너뛰지 않음)
//! - 송신 직전 장애 시뮬레이터 통과

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::channel::recv_datagram;
use crate::frame::{Frame, Segmenter};
use crate::impairment::{ImpairmentConfig, ImpairmentSimulator, Outcome};
use crate::message::ControlFrame;
use crate::stats::TransferStats;
use crate::{Config, Error, Result, MAX_WINDOW_SIZE, WINDOW_MOD};

/// 세션 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// GET 대기 (세션 생성 전)
    AwaitOpen,

    /// 데이터 프레임 스트리밍 중
    Streaming,

    /// 윈도우 한도 도달로 송신 보류 중
    Draining,

    /// 종료 프레임 송신 완료
    Terminated,
}

/// 세션 윈도우 상태 (수락된 GET 하나당 한 개)
///
/// 슬롯 번호는 WINDOW_MOD로 랩되지만 패킷 인덱스는 랩되지 않으므로,
/// 수신 슬롯에 `window_offset`(WINDOW_MOD의 배수)을 더해 절대 인덱스를
/// 복원한다.
#[derive(Debug)]
pub struct SessionState {
    /// 전송 계획 (세션 시작 시 한 번에 구체화)
    pub packets: Vec<crate::frame::DataFrame>,

    /// 다음에 보낼 패킷 인덱스
    pub cursor: usize,

    /// 슬롯 → 절대 인덱스 변환 오프셋 (WINDOW_MOD의 배수)
    pub window_offset: usize,

    /// 미확인 송신 시도 수 (MAX_WINDOW_SIZE 상한)
    pub unacked_count: usize,

    /// 현재 단계
    pub phase: SessionPhase,
}

impl SessionState {
    /// 스트리밍 단계로 새 세션 생성
    pub fn new(packets: Vec<crate::frame::DataFrame>) -> Self {
        Self {
            packets,
            cursor: 0,
            window_offset: 0,
            unacked_count: 0,
            phase: SessionPhase::Streaming,
        }
    }

    /// 모든 패킷이 확인되었는지
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.packets.len()
    }

    /// 윈도우 정체 여부 (송신 보류 조건)
    pub fn window_full(&self) -> bool {
        self.unacked_count > MAX_WINDOW_SIZE
    }

    /// ACK(slot) 처리
    ///
    /// slot == 0은 6비트 슬롯 카운터의 랩어라운드 신호이므로 오프셋을
    /// WINDOW_MOD만큼 올린다. 변환된 절대 인덱스가 전송 계획 밖이면
    /// (손상된 제어 데이터) 상태를 바꾸지 않는다.
    pub fn on_ack(&mut self, slot: u8) {
        let bumped_offset = if slot == 0 {
            self.window_offset + WINDOW_MOD
        } else {
            self.window_offset
        };
        let target = slot as usize + bumped_offset;

        if target > self.packets.len() {
            warn!("ACK 슬롯이 전송 계획을 벗어남: slot={} target={}", slot, target);
            return;
        }

        self.unacked_count = self.unacked_count.saturating_sub(1);
        self.window_offset = bumped_offset;
        self.cursor = target;
        self.phase = SessionPhase::Streaming;
    }

    /// NAK(slot) 처리: 해당 절대 인덱스부터 명시적 재전송
    ///
    /// 절대 인덱스가 정확히 계획 길이와 같으면 손상이 아니라 완료
    /// 신호다: 모든 프레임이 수락된 뒤 최종 ACK가 유실되면 수신자는
    /// 재전송된 마지막 프레임에 Nak(기대 슬롯)으로 답하는데, 그 기대
    /// 슬롯의 절대 인덱스가 계획 길이다. 계획 길이를 넘는 값만 무시한다.
    pub fn on_nak(&mut self, slot: u8) {
        let target = slot as usize + self.window_offset;

        if target > self.packets.len() {
            warn!("NAK 슬롯이 전송 계획을 벗어남: slot={} target={}", slot, target);
            return;
        }

        self.cursor = target;
    }

    /// 수신 타임아웃 처리
    ///
    /// 커서는 움직이지 않는다 — 다음 반복에서 같은 프레임을 재전송한다.
    /// 미확인 카운터는 상한까지만 올라가고, 상한에 닿으면 배수 단계로
    /// 들어간다.
    pub fn on_timeout(&mut self) {
        self.unacked_count = (self.unacked_count + 1).min(MAX_WINDOW_SIZE);
        if self.unacked_count == MAX_WINDOW_SIZE {
            self.phase = SessionPhase::Draining;
        }
    }
}

/// 송신자
pub struct Sender {
    /// 제공 파일 루트 디렉터리
    root_dir: PathBuf,

    /// 프로토콜 설정
    config: Config,

    /// 장애 시뮬레이터 (데이터 프레임에만 적용)
    impairment: ImpairmentSimulator,

    /// 분할기
    segmenter: Segmenter,
}

impl Sender {
    /// 새 송신자 생성 (확률 검증은 여기서 fail-fast)
    pub fn new(
        root_dir: impl Into<PathBuf>,
        config: Config,
        impairment_config: ImpairmentConfig,
    ) -> Result<Self> {
        Ok(Self {
            root_dir: root_dir.into(),
            config,
            impairment: ImpairmentSimulator::new(impairment_config)?,
            segmenter: Segmenter::new(),
        })
    }

    /// 고정 시드 장애 주입으로 생성 (재현 가능한 실행)
    pub fn seeded(
        root_dir: impl Into<PathBuf>,
        config: Config,
        impairment_config: ImpairmentConfig,
        seed: u64,
    ) -> Result<Self> {
        Ok(Self {
            root_dir: root_dir.into(),
            config,
            impairment: ImpairmentSimulator::seeded(impairment_config, seed)?,
            segmenter: Segmenter::new(),
        })
    }

    /// GET 요청을 순차적으로 영원히 처리
    ///
    /// 세션 수준 실패는 로그만 남기고 다음 GET을 기다린다. 소켓 IO
    /// 에러만 치명적이다.
    pub async fn serve(&mut self, socket: &UdpSocket) -> Result<()> {
        info!("GBN 송신자 대기 시작: {}", socket.local_addr()?);
        let mut buf = vec![0u8; crate::SEGMENT_SIZE];

        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;

            match ControlFrame::from_bytes(&buf[..len]) {
                Ok(ControlFrame::Get(filename)) => {
                    info!("GET 수신: {} (from {})", filename, peer);
                    if let Err(e) = self.run_session(socket, peer, &filename).await {
                        warn!("세션 실패: {}", e);
                    }
                }
                Ok(other) => debug!("세션 외 제어 프레임 무시: {:?}", other),
                Err(e) => debug!("해석 불가 데이터그램 무시: {}", e),
            }
        }
    }

    /// 수락된 GET 하나에 대한 세션 실행
    async fn run_session(
        &mut self,
        socket: &UdpSocket,
        peer: std::net::SocketAddr,
        filename: &str,
    ) -> Result<()> {
        let path = self.root_dir.join(filename);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 없는 파일은 ERR 응답 후 깨끗하게 종료. 스트리밍 단계에
                // 들어가지 않는다.
                warn!("존재하지 않는 파일 요청: {}", filename);
                socket.send_to(&ControlFrame::OpenErr.to_bytes(), peer).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        socket.send_to(&ControlFrame::OpenAck.to_bytes(), peer).await?;

        let packets = self.segmenter.segment(&contents);
        info!("전송 시작: {} ({} bytes, {} frames)", filename, contents.len(), packets.len());

        let mut session = SessionState::new(packets);
        let mut stats = TransferStats::new();
        let mut consecutive_timeouts = 0u32;
        let mut highest_sent: Option<u32> = None;
        let timeout = Duration::from_millis(self.config.recv_timeout_ms);
        let mut resp_buf = vec![0u8; crate::SEGMENT_SIZE];

        while !session.is_complete() {
            let frame = &session.packets[session.cursor];
            let sequence = frame.sequence;
            let mut wire = Frame::Data(frame.clone()).to_bytes();

            match self.impairment.apply(&mut wire) {
                Outcome::Lost => {
                    // 채널에 올리지 않지만 응답 대기는 그대로 진행한다.
                    // 상대는 결국 타임아웃이나 NAK으로 교정을 이끈다.
                    debug!("유실 주입: seq={}", sequence);
                    stats.injected_losses += 1;
                }
                outcome => {
                    if outcome == Outcome::Delayed {
                        debug!("지연 주입: seq={}", sequence);
                        stats.injected_delays += 1;
                        tokio::time::sleep(self.impairment.hold_duration()).await;
                    }

                    if session.window_full() {
                        debug!("윈도우 정체: 송신 보류 (unacked={})", session.unacked_count);
                    } else {
                        socket.send_to(&wire, peer).await?;
                        stats.frames_sent += 1;
                        stats.total_bytes += session.packets[session.cursor].payload.len() as u64;
                        match highest_sent {
                            Some(high) if sequence <= high => stats.retransmissions += 1,
                            _ => highest_sent = Some(sequence),
                        }
                    }
                }
            }

            match recv_datagram(socket, &mut resp_buf, timeout).await {
                Ok((len, _from)) => match ControlFrame::from_bytes(&resp_buf[..len]) {
                    Ok(ControlFrame::Ack(slot)) => {
                        consecutive_timeouts = 0;
                        stats.acks += 1;
                        session.on_ack(slot);
                    }
                    Ok(ControlFrame::Nak(slot)) => {
                        consecutive_timeouts = 0;
                        stats.naks += 1;
                        debug!("NAK 수신: slot={}", slot);
                        session.on_nak(slot);
                    }
                    Ok(other) => debug!("예상 밖 제어 프레임 무시: {:?}", other),
                    Err(e) => debug!("손상된 제어 프레임 무시: {}", e),
                },
                Err(Error::ChannelTimeout) => {
                    stats.timeouts += 1;
                    consecutive_timeouts += 1;
                    if consecutive_timeouts >= self.config.max_consecutive_timeouts {
                        return Err(Error::TransferAborted {
                            timeouts: consecutive_timeouts,
                        });
                    }
                    session.on_timeout();
                    debug!("응답 타임아웃: seq={} 재전송 예정", sequence);
                }
                Err(e) => return Err(e),
            }
        }

        // 종료 프레임은 프레임 루프 밖에서 보내므로 장애 주입을 거치지
        // 않는다. 유실되면 양쪽이 교착하기 때문이다.
        socket.send_to(&Frame::Terminator.to_bytes(), peer).await?;
        session.phase = SessionPhase::Terminated;

        info!("세션 완료: {} | {}", filename, stats.summary());
        Ok(())
    }
}
