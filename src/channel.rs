//! 비신뢰 데이터그램 채널 경계
//!
//! 채널은 전달도 순서도 보장하지 않는다. 이 모듈은 마감 시간이 있는
//! 수신 하나만 감싸고, 순서와 신뢰 보장은 전부 프로토콜 계층이 만든다.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// 마감 시간이 있는 데이터그램 수신
///
/// 마감까지 아무것도 도착하지 않으면 `ChannelTimeout`을 반환한다.
/// 호출자는 이를 치명적으로 다루지 않고 재전송/재시도 정책으로 흡수한다.
pub(crate) async fn recv_datagram(
    socket: &UdpSocket,
    buf: &mut [u8],
    deadline: Duration,
) -> Result<(usize, SocketAddr)> {
    match tokio::time::timeout(deadline, socket.recv_from(buf)).await {
        Ok(Ok(received)) => Ok(received),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(Error::ChannelTimeout),
    }
}
