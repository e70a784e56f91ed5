//! 에러 타입 정의

use thiserror::Error;

/// GBN 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("수신 타임아웃")]
    ChannelTimeout,

    #[error("체크섬 불일치: expected {expected:08X}, got {got:08X}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("시퀀스/슬롯 불일치: expected {expected}, got {got}")]
    SequenceMismatch { expected: u32, got: u32 },

    #[error("손상된 프레임: len={len}")]
    MalformedFrame { len: usize },

    #[error("파일 없음: {name}")]
    FileNotFound { name: String },

    #[error("유효하지 않은 파일명: {name}")]
    InvalidFilename { name: String },

    #[error("유효하지 않은 확률 값: {value} (0.0 ~ 1.0 필요)")]
    InvalidProbability { value: f64 },

    #[error("핸드쉐이크 실패: {retries}회 재시도 후 응답 없음")]
    HandshakeFailed { retries: u32 },

    #[error("전송 중단: 연속 타임아웃 {timeouts}회")]
    TransferAborted { timeouts: u32 },
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
