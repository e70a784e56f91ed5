//! GBN 서버 (송신자) - Go-Back-N ARQ 파일 전송
//!
//! 슬라이딩 윈도우 ARQ 전송 프로토콜 서버
//! - GET 요청을 순차 처리, ACK/NAK 기반 재전송
//! - 송신 프레임에 손실/손상/지연 장애 주입 (선택)
//!
//! 사용법:
//!   cargo run --release --bin gbn-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 서빙
//!   cargo run --release --bin gbn-server -- --bind 0.0.0.0:9000 --root ./files
//!
//!   # 장애 주입 (손실 10%, 손상 20%)
//!   cargo run --release --bin gbn-server -- --loss 0.1 --corrupt 0.2

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::UdpSocket;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gbn::{Config, ImpairmentConfig, Sender};

/// 서버 설정
struct ServerConfig {
    bind_addr: SocketAddr,
    root_dir: PathBuf,
    seed: Option<u64>,
    impairment: ImpairmentConfig,
    config: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            root_dir: PathBuf::from("."),
            seed: None,
            impairment: ImpairmentConfig::default(),
            config: Config::default(),
        }
    }
}

fn parse_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ServerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--root" | "-r" => {
                if i + 1 < args.len() {
                    config.root_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--loss" => {
                if i + 1 < args.len() {
                    config.impairment.loss = args[i + 1].parse().expect("유효한 확률 필요");
                    i += 1;
                }
            }
            "--corrupt" => {
                if i + 1 < args.len() {
                    config.impairment.corrupt = args[i + 1].parse().expect("유효한 확률 필요");
                    i += 1;
                }
            }
            "--delay" => {
                if i + 1 < args.len() {
                    config.impairment.delay = args[i + 1].parse().expect("유효한 확률 필요");
                    i += 1;
                }
            }
            "--delay-hold" => {
                if i + 1 < args.len() {
                    config.impairment.delay_hold_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    config.config.recv_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    config.seed = Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"GBN Server - Go-Back-N ARQ 파일 전송 서버

슬라이딩 윈도우 ARQ 전송 프로토콜 서버
- GET 요청 순차 처리, ACK/NAK 기반 재전송
- 송신 프레임에 손실/손상/지연 장애 주입 (선택)

사용법:
  cargo run --release --bin gbn-server -- [OPTIONS]

옵션:
  -b, --bind <ADDR>     바인드 주소 (기본: 0.0.0.0:9000)
  -r, --root <DIR>      제공 파일 루트 디렉터리 (기본: .)
  --loss <P>            프레임 유실 확률 0.0~1.0 (기본: 0)
  --corrupt <P>         프레임 손상 확률 0.0~1.0 (기본: 0)
  --delay <P>           프레임 지연 확률 0.0~1.0 (기본: 0)
  --delay-hold <MS>     지연 시 보류 시간 밀리초 (기본: 100)
  --timeout <MS>        응답 수신 타임아웃 밀리초 (기본: 500)
  --seed <N>            장애 주입 RNG 시드 (재현 가능한 실행)
  -h, --help            이 도움말 출력

예시:
  # 파일 서빙
  cargo run --release --bin gbn-server -- --root ./files

  # 불안정 채널 시뮬레이션 (재현 가능)
  cargo run --release --bin gbn-server -- --loss 0.1 --corrupt 0.2 --seed 42
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server_config = parse_args();

    info!("GBN Server starting...");
    info!("Bind address: {}", server_config.bind_addr);
    info!("Root directory: {:?}", server_config.root_dir);
    info!(
        "Impairment: loss={:.2} corrupt={:.2} delay={:.2}",
        server_config.impairment.loss,
        server_config.impairment.corrupt,
        server_config.impairment.delay
    );

    let mut sender = match server_config.seed {
        Some(seed) => {
            info!("Impairment seed: {}", seed);
            Sender::seeded(
                server_config.root_dir,
                server_config.config,
                server_config.impairment,
                seed,
            )?
        }
        None => Sender::new(
            server_config.root_dir,
            server_config.config,
            server_config.impairment,
        )?,
    };

    let socket = UdpSocket::bind(server_config.bind_addr).await?;
    info!("Server listening on {}", socket.local_addr()?);

    sender.serve(&socket).await?;

    Ok(())
}
