//! 전송 통계

use std::time::{Duration, Instant};

/// 세션 하나의 전송 통계
///
/// 송신자와 수신자가 같은 구조를 쓰고 각자 해당하는 카운터만 올린다.
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 세션 시작 시간
    pub start_time: Instant,

    /// 송신한 데이터 프레임 수 (재전송 포함)
    pub frames_sent: u64,

    /// 수락한 데이터 프레임 수
    pub frames_accepted: u64,

    /// 재전송 프레임 수 (이미 보낸 인덱스를 다시 송신)
    pub retransmissions: u64,

    /// 주고받은 ACK 수
    pub acks: u64,

    /// 주고받은 NAK 수
    pub naks: u64,

    /// 수신 타임아웃 횟수
    pub timeouts: u64,

    /// 주입된 유실 수
    pub injected_losses: u64,

    /// 주입된 지연 수
    pub injected_delays: u64,

    /// 페이로드 총 바이트
    pub total_bytes: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames_sent: 0,
            frames_accepted: 0,
            retransmissions: 0,
            acks: 0,
            naks: 0,
            timeouts: 0,
            injected_losses: 0,
            injected_delays: 0,
            total_bytes: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 페이로드 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Sent: {} | Accepted: {} | Retransmits: {} | ACKs: {} | NAKs: {} | Timeouts: {} | Bytes: {} | Throughput: {:.2} KB/s",
            self.elapsed().as_secs_f64(),
            self.frames_sent,
            self.frames_accepted,
            self.retransmissions,
            self.acks,
            self.naks,
            self.timeouts,
            self.total_bytes,
            self.throughput() / 1_000.0,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_contains_counters() {
        let mut stats = TransferStats::new();
        stats.frames_sent = 10;
        stats.naks = 2;
        stats.total_bytes = 5030;

        let summary = stats.summary();
        assert!(summary.contains("Sent: 10"));
        assert!(summary.contains("NAKs: 2"));
        assert!(summary.contains("Bytes: 5030"));
    }
}
