//! 장애 시뮬레이터
//!
//! 송신 직전의 데이터 프레임에 손실/손상/지연을 확률적으로 주입해
//! ARQ 엔진을 적대적 조건에서 검증한다. 제어 프레임과 종료 프레임은
//! 시뮬레이터를 거치지 않는다.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// 손상 시 덮어쓰는 고정 센티널 바이트
const CORRUPT_SENTINEL: u8 = b'1';

/// 장애 주입 설정
///
/// 모든 확률은 [0.0, 1.0] 범위. 기본값은 전부 0 (투명 통과).
#[derive(Debug, Clone)]
pub struct ImpairmentConfig {
    /// 프레임 유실 확률
    pub loss: f64,

    /// 프레임 손상 확률
    pub corrupt: f64,

    /// 프레임 지연 확률
    pub delay: f64,

    /// 지연 판정 시 송신 전 대기 시간 (밀리초)
    pub delay_hold_ms: u64,
}

impl Default for ImpairmentConfig {
    fn default() -> Self {
        Self {
            loss: 0.0,
            corrupt: 0.0,
            delay: 0.0,
            delay_hold_ms: 100,
        }
    }
}

impl ImpairmentConfig {
    /// 확률 범위 검증 (세션 시작 전 fail-fast)
    pub fn validate(&self) -> Result<()> {
        for value in [self.loss, self.corrupt, self.delay] {
            // NaN도 이 비교에서 걸러짐
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidProbability { value });
            }
        }
        Ok(())
    }
}

/// 프레임 하나에 대한 판정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 정상 전달 (손상되었을 수 있음)
    Delivered,

    /// 유실: 채널에 올리면 안 됨
    Lost,

    /// 지연: 설정된 시간만큼 보류 후 송신 (손상과 독립적으로 공존 가능)
    Delayed,
}

/// 장애 시뮬레이터
///
/// 단일 RNG에서 호출마다 독립적으로 추첨한다. 유실이 판정되면 손상은
/// 평가하지 않고 (상호 배타), 지연과 손상은 독립이다.
pub struct ImpairmentSimulator {
    config: ImpairmentConfig,
    rng: StdRng,
}

impl ImpairmentSimulator {
    /// 엔트로피 시드로 생성
    pub fn new(config: ImpairmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::from_entropy(),
        })
    }

    /// 고정 시드로 생성 (재현 가능한 실행)
    pub fn seeded(config: ImpairmentConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// 지연 판정 시 호출자가 보류해야 하는 시간
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.config.delay_hold_ms)
    }

    /// 송신 직전 프레임 하나에 장애 주입
    ///
    /// 판정 순서:
    /// 1. 유실 추첨 — 걸리면 즉시 `Lost` 반환, 프레임은 건드리지 않음
    /// 2. 지연 추첨 — 걸리면 결과가 `Delayed`가 되지만 계속 진행
    /// 3. 손상 추첨 — 걸리면 심도(severity)를 추가로 뽑아 바이트 1개를
    ///    센티널로 덮고, 심도 ≤ 0.2면 2개째, ≤ 0.1이면 3개째를 덮는다
    ///    (심도가 낮을수록 더 많이 망가지는 계층형 모델). 제자리 변형.
    pub fn apply(&mut self, frame: &mut [u8]) -> Outcome {
        if self.rng.gen::<f64>() < self.config.loss {
            return Outcome::Lost;
        }

        let mut outcome = Outcome::Delivered;
        if self.rng.gen::<f64>() < self.config.delay {
            outcome = Outcome::Delayed;
        }

        if self.rng.gen::<f64>() < self.config.corrupt && !frame.is_empty() {
            let severity: f64 = self.rng.gen();
            let mut flips = 1;
            if severity <= 0.2 {
                flips = 2;
            }
            if severity <= 0.1 {
                flips = 3;
            }
            for _ in 0..flips {
                let idx = self.rng.gen_range(0..frame.len());
                frame[idx] = CORRUPT_SENTINEL;
            }
        }

        outcome
    }
}
