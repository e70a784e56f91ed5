//! 데이터 프레임 코덱과 분할기
//!
//! - DataFrame: 페이로드 청크 하나의 와이어 표현
//! - Frame: 데이터 프레임 | 종료 프레임 태그 유니온
//! - Segmenter: 파일 내용을 순서 있는 프레임 열로 분할

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::{HEADER_SIZE, MAX_PAYLOAD, SEGMENT_SIZE, WINDOW_MOD};

/// 가산 체크섬 계산
///
/// 각 바이트를 부호 없는 0~255 값으로 더하고 u32 랩어라운드로 절단한다.
/// 모듈러 연산이 아니라 오버플로우 랩이므로 플랫폼과 무관하게 결정적이다.
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(b as u32))
}

/// 데이터 프레임 (페이로드 청크 하나)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// 절대 패킷 인덱스 (0부터 단조 증가, 랩 없음)
    pub sequence: u32,

    /// 페이로드 가산 체크섬
    pub checksum: u32,

    /// 페이로드 (최대 MAX_PAYLOAD 바이트)
    pub payload: Bytes,
}

impl DataFrame {
    /// 새 데이터 프레임 생성 (체크섬은 항상 재계산)
    pub fn new(sequence: u32, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            sequence,
            checksum: checksum(&payload),
            payload,
        }
    }

    /// 윈도우 슬롯 번호 (시퀀스를 WINDOW_MOD로 접은 값)
    pub fn slot(&self) -> u8 {
        (self.sequence as usize % WINDOW_MOD) as u8
    }

    /// 체크섬 검증
    ///
    /// 수신한 체크섬 필드는 신뢰하지 않고 페이로드에서 다시 계산해 비교한다.
    pub fn verify(&self) -> Result<()> {
        let computed = checksum(&self.payload);
        if computed != self.checksum {
            return Err(Error::ChecksumMismatch {
                expected: self.checksum,
                got: computed,
            });
        }
        Ok(())
    }
}

/// 와이어 프레임 (데이터 또는 종료)
///
/// ok_flag 바이트가 변형을 인코딩한다: 0이 아니면 데이터, 0이면 종료.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// 일반 데이터 프레임
    Data(DataFrame),

    /// 전송 종료 표식 (단일 0 바이트)
    Terminator,
}

impl Frame {
    /// 프레임을 바이트로 직렬화
    ///
    /// 데이터 프레임은 헤더 9바이트 + 페이로드. 패딩은 없다 — 페이로드
    /// 길이는 데이터그램 길이가 실어 나르므로, 가득 찬 프레임은 정확히
    /// SEGMENT_SIZE 바이트이고 마지막 프레임만 짧을 수 있다.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Frame::Data(frame) => {
                let mut buf = Vec::with_capacity(HEADER_SIZE + frame.payload.len());
                buf.push(1u8);
                buf.extend_from_slice(&frame.checksum.to_le_bytes());
                buf.extend_from_slice(&frame.sequence.to_le_bytes());
                buf.extend_from_slice(&frame.payload);
                buf
            }
            Frame::Terminator => vec![0u8],
        }
    }

    /// 바이트에서 프레임 역직렬화
    ///
    /// 첫 바이트가 0이면 길이와 무관하게 종료 프레임이다. 데이터
    /// 프레임은 헤더 뒤에 페이로드가 최소 한 바이트 있어야 하며
    /// (와이어 길이 10~512), 그 이하는 `MalformedFrame`. 페이로드에서
    /// 0 바이트를 찾는 길이 추정은 하지 않는다.
    pub fn from_bytes(bytes: &[u8]) -> Result<Frame> {
        match bytes.first() {
            None => Err(Error::MalformedFrame { len: 0 }),
            Some(0) => Ok(Frame::Terminator),
            Some(_) => {
                if bytes.len() <= HEADER_SIZE {
                    return Err(Error::MalformedFrame { len: bytes.len() });
                }
                let checksum = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
                let sequence = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
                let end = bytes.len().min(SEGMENT_SIZE);
                let payload = Bytes::copy_from_slice(&bytes[HEADER_SIZE..end]);

                Ok(Frame::Data(DataFrame {
                    sequence,
                    checksum,
                    payload,
                }))
            }
        }
    }
}

/// 분할기 (송신측)
///
/// 전송 시작 전에 전체 프레임 계획을 메모리에 만들어 둔다. 재전송이
/// 인덱스 접근만으로 가능해지므로 윈도우/오프셋 계산이 단순해진다.
pub struct Segmenter {
    payload_size: usize,
}

impl Segmenter {
    /// 기본 페이로드 크기(MAX_PAYLOAD)로 생성
    pub fn new() -> Self {
        Self {
            payload_size: MAX_PAYLOAD,
        }
    }

    /// 테스트용: 페이로드 크기 지정
    pub fn with_payload_size(payload_size: usize) -> Self {
        debug_assert!(payload_size > 0 && payload_size <= MAX_PAYLOAD);
        Self { payload_size }
    }

    /// 파일 내용을 순서 있는 데이터 프레임 열로 분할
    ///
    /// 시퀀스 번호는 0, 1, 2, … 순서대로 부여되고 마지막 청크만 짧을 수
    /// 있다. 빈 입력은 빈 열을 만든다 (종료 프레임만 전송됨).
    pub fn segment(&self, contents: &[u8]) -> Vec<DataFrame> {
        contents
            .chunks(self.payload_size)
            .enumerate()
            .map(|(idx, chunk)| DataFrame::new(idx as u32, Bytes::copy_from_slice(chunk)))
            .collect()
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}
