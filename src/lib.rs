//! # GBN (Go-Back-N)
//!
//! UDP 기반 슬라이딩 윈도우 ARQ 파일 전송 프로토콜
//!
//! ## 핵심 특징
//! - **Go-Back-N ARQ**: 순서 밖 프레임은 버퍼링하지 않고 기대 슬롯부터 재전송 요구
//! - **슬롯 기반 제어**: 시퀀스 번호를 64로 접은 슬롯만 ACK/NAK에 실어 제어 프레임 최소화
//! - **고정 윈도우**: 미확인 전송 32개 한도로 정체 감지
//! - **가산 체크섬**: 페이로드 바이트 합산으로 손상 감지
//! - **장애 시뮬레이터**: 손실/손상/지연 확률 주입으로 프로토콜 검증

mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod impairment;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod stats;

pub use config::Config;
pub use error::{Error, Result};
pub use frame::{checksum, DataFrame, Frame, Segmenter};
pub use impairment::{ImpairmentConfig, ImpairmentSimulator, Outcome};
pub use message::ControlFrame;
pub use receiver::{Admission, ReassemblyState, Receiver};
pub use sender::{Sender, SessionPhase, SessionState};
pub use stats::TransferStats;

/// 전체 프레임 크기 (바이트)
pub const SEGMENT_SIZE: usize = 512;

/// 데이터 프레임 헤더 크기 (ok_flag 1 + checksum 4 + sequence 4)
pub const HEADER_SIZE: usize = 9;

/// 프레임당 최대 페이로드 (바이트)
pub const MAX_PAYLOAD: usize = SEGMENT_SIZE - HEADER_SIZE;

/// 슬롯 모듈러 (시퀀스 번호를 이 값으로 나눈 나머지가 슬롯)
pub const WINDOW_MOD: usize = 64;

/// 최대 미확인 전송 수 (슬롯 공간의 절반)
pub const MAX_WINDOW_SIZE: usize = 32;
