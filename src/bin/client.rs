//! GBN 클라이언트 (수신자) - Go-Back-N ARQ 파일 전송
//!
//! 슬라이딩 윈도우 ARQ 전송 프로토콜 클라이언트
//! - GET 요청 후 순서대로 프레임 수락, ACK/NAK 응답
//! - 수신 파일은 출력 디렉터리에 recv_ 접두로 저장
//!
//! 사용법:
//!   cargo run --release --bin gbn-client -- --file <NAME> [OPTIONS]
//!
//! 예시:
//!   # 기본 수신
//!   cargo run --release --bin gbn-client -- --server 127.0.0.1:9000 --file data.bin
//!
//!   # 출력 디렉터리 지정
//!   cargo run --release --bin gbn-client -- -f data.bin -o ./downloads

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::UdpSocket;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gbn::{Config, Receiver};

/// 클라이언트 설정
struct ClientConfig {
    bind_addr: SocketAddr,
    server_addr: SocketAddr,
    filename: Option<String>,
    out_dir: PathBuf,
    config: Config,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".parse().unwrap(),
            server_addr: "127.0.0.1:9000".parse().unwrap(),
            filename: None,
            out_dir: PathBuf::from("."),
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    config.server_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.filename = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--out-dir" | "-o" => {
                if i + 1 < args.len() {
                    config.out_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    config.config.recv_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"GBN Client - Go-Back-N ARQ 파일 전송 클라이언트

슬라이딩 윈도우 ARQ 전송 프로토콜 클라이언트
- GET 요청 후 순서대로 프레임 수락, ACK/NAK 응답
- 수신 파일은 출력 디렉터리에 recv_ 접두로 저장

사용법:
  cargo run --release --bin gbn-client -- --file <NAME> [OPTIONS]

옵션:
  -b, --bind <ADDR>     로컬 바인드 주소 (기본: 0.0.0.0:0 = 자동 할당)
  -s, --server <ADDR>   서버 주소 (기본: 127.0.0.1:9000)
  -f, --file <NAME>     요청할 파일명 (필수)
  -o, --out-dir <DIR>   출력 디렉터리 (기본: .)
  --timeout <MS>        프레임 수신 타임아웃 밀리초 (기본: 500)
  -h, --help            이 도움말 출력

예시:
  # 서버에서 파일 수신
  cargo run --release --bin gbn-client -- --server 192.168.1.100:9000 --file data.bin

  # 출력 디렉터리 지정
  cargo run --release --bin gbn-client -- -f data.bin -o ./downloads
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

    let client_config = parse_args();

    let filename = client_config
        .filename
        .ok_or("--file <NAME> 인자가 필요합니다 (--help 참고)")?;

    info!("GBN Client starting...");
    info!("Server address: {}", client_config.server_addr);
    info!("Requested file: {}", filename);

    let socket = UdpSocket::bind(client_config.bind_addr).await?;
    info!("Bound to local address: {}", socket.local_addr()?);

    let receiver = Receiver::new(client_config.config);
    let dest = receiver
        .fetch(
            &socket,
            client_config.server_addr,
            &filename,
            &client_config.out_dir,
        )
        .await?;

    info!("Saved to {:?}", dest);

    Ok(())
}
