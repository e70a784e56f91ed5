//! 프로토콜 설정

/// GBN 프로토콜 설정
///
/// 장애 주입 확률은 여기가 아니라 [`crate::ImpairmentConfig`]로
/// 생성자에 명시적으로 전달한다.
#[derive(Debug, Clone)]
pub struct Config {
    /// 응답/프레임 수신 대기 시간 (밀리초)
    ///
    /// 만료 시 송신자는 현재 프레임을 재전송하고 수신자는 계속 대기한다.
    /// 재시도 백오프는 없다.
    pub recv_timeout_ms: u64,

    /// 핸드쉐이크(GET → ACK/ERR) 최대 재시도 횟수
    pub handshake_retries: u32,

    /// 핸드쉐이크 재시도 간격 (밀리초)
    pub handshake_retry_interval_ms: u64,

    /// 세션 중단 기준 연속 타임아웃 횟수
    ///
    /// 정상적인 손실 복구에는 걸리지 않을 만큼 여유 있게 잡는다.
    pub max_consecutive_timeouts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recv_timeout_ms: 500,
            handshake_retries: 20,
            handshake_retry_interval_ms: 500,
            max_consecutive_timeouts: 20,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 불안정한 네트워크용 설정
    pub fn unstable_network() -> Self {
        Self {
            recv_timeout_ms: 1000,
            handshake_retries: 40,
            handshake_retry_interval_ms: 1000,
            max_consecutive_timeouts: 50,
        }
    }

    /// 로컬 루프백 테스트용 설정 (짧은 타임아웃)
    pub fn local_test() -> Self {
        Self {
            recv_timeout_ms: 50,
            handshake_retries: 10,
            handshake_retry_interval_ms: 50,
            max_consecutive_timeouts: 40,
        }
    }
}
