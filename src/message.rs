//! 제어 프레임 정의
//!
//! Go-Back-N 제어 채널은 다섯 가지 동사만 쓴다: 파일 요청(GET), 세션
//! 개시 응답(ACK/ERR), 스트리밍 중 프레임별 ACK/NAK. 태그는 3글자
//! 식별자를 NUL로 채워 4바이트로 맞춘다.

use crate::error::{Error, Result};
use crate::WINDOW_MOD;

const GET_TAG: &[u8; 4] = b"GET\0";
const ACK_TAG: &[u8; 4] = b"ACK\0";
const NAK_TAG: &[u8; 4] = b"NAK\0";
const ERR_TAG: &[u8; 4] = b"ERR\0";

/// 제어 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// 파일 요청 (태그 + 파일명)
    Get(String),

    /// 세션 개시 승인 (파일 열람 가능)
    OpenAck,

    /// 세션 개시 거부 (파일 없음)
    OpenErr,

    /// 프레임 수락 (다음 기대 슬롯 번호 포함)
    Ack(u8),

    /// 프레임 거절 (재전송 요청 슬롯 번호 포함)
    Nak(u8),
}

impl ControlFrame {
    /// 제어 프레임을 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ControlFrame::Get(filename) => {
                let mut buf = Vec::with_capacity(4 + filename.len());
                buf.extend_from_slice(GET_TAG);
                buf.extend_from_slice(filename.as_bytes());
                buf
            }
            ControlFrame::OpenAck => ACK_TAG.to_vec(),
            ControlFrame::OpenErr => ERR_TAG.to_vec(),
            ControlFrame::Ack(slot) => {
                let mut buf = Vec::with_capacity(5);
                buf.push(*slot);
                buf.extend_from_slice(ACK_TAG);
                buf
            }
            ControlFrame::Nak(slot) => {
                let mut buf = Vec::with_capacity(5);
                buf.push(*slot);
                buf.extend_from_slice(NAK_TAG);
                buf
            }
        }
    }

    /// 바이트에서 제어 프레임 역직렬화
    ///
    /// 고정 레이아웃으로 판별한다: 정확히 4바이트는 개시 응답, 정확히
    /// 5바이트에 뒤 4바이트가 ACK/NAK 태그면 슬롯 응답, 그 외에는
    /// GET 접두 + 파일명. 어느 것도 아니면 `MalformedFrame`.
    pub fn from_bytes(bytes: &[u8]) -> Result<ControlFrame> {
        if bytes.len() < 4 {
            return Err(Error::MalformedFrame { len: bytes.len() });
        }

        if bytes.len() == 4 {
            return match &bytes[0..4] {
                tag if tag == ACK_TAG => Ok(ControlFrame::OpenAck),
                tag if tag == ERR_TAG => Ok(ControlFrame::OpenErr),
                _ => Err(Error::MalformedFrame { len: 4 }),
            };
        }

        if bytes.len() == 5 {
            let slot = bytes[0];
            match &bytes[1..5] {
                tag if tag == ACK_TAG => return Self::slotted(slot, true),
                tag if tag == NAK_TAG => return Self::slotted(slot, false),
                _ => {} // GET + 한 글자 파일명일 수 있음
            }
        }

        if &bytes[0..4] == GET_TAG {
            let filename = std::str::from_utf8(&bytes[4..])
                .map_err(|_| Error::MalformedFrame { len: bytes.len() })?;
            return Ok(ControlFrame::Get(filename.to_string()));
        }

        Err(Error::MalformedFrame { len: bytes.len() })
    }

    fn slotted(slot: u8, ack: bool) -> Result<ControlFrame> {
        if slot as usize >= WINDOW_MOD {
            return Err(Error::MalformedFrame { len: 5 });
        }
        Ok(if ack {
            ControlFrame::Ack(slot)
        } else {
            ControlFrame::Nak(slot)
        })
    }
}
