#![deny(unsafe_code)]
#![doc = r#"
# spark-transport-vsock

## 设计动机（Why）
- **定位**：该 crate 提供 Spark 在 VM socket（VSOCK）上的客户端字节流连接，
  用于虚拟机与宿主、或同一 Hypervisor 下虚拟机之间的通信；端点以上下文 ID（CID）
  与端口二元组寻址。
- **架构角色**：位于传输实现层最底部，只交付有序字节流；分帧、加密、多路复用与
  重试策略都属于上层职责。
- **设计理念**：建连序列的每个失败点都不得泄漏描述符；描述符所有权由拨号器的守卫
  一次性移交给连接，类型系统保证同一时刻只有一个所有者。

## 核心契约（What）
- [`dial_stream`]：分配 → 建连 → 查询本地地址 → 封装为 [`VsockConnection`]；
- [`VsockConnection`]：本端/对端地址、单次读写、绝对截止时间、半关闭与关闭；
- [`StreamDescriptor`]/[`DescriptorProvider`]：内核描述符的能力抽象，生产实现为
  基于 `socket2` 的 [`VsockSocket`]，测试可注入模拟实现；
- 全部失败以 [`VsockError`] 返回，附带稳定错误码与 [`ErrorCategory`]。

## 实现策略（How）
- **同步门面**：不引入任何异步运行时或后台线程，读写直接对应一次阻塞系统调用；
- **截止时间**：以 [`Deadline`] 表达绝对时间点，在每次读写前换算为
  `SO_RCVTIMEO`/`SO_SNDTIMEO`，到期以 [`VsockError::Timeout`] 返回；
- **清理守卫**：建连阶段描述符由内部守卫持有，任何提前返回都会触发一次关闭。

## 风险与考量（Trade-offs）
- **平台**：VSOCK 仅存在于 Linux/Android；其它平台上分配描述符会返回 `Unsupported`。
- **并发度**：一个读者与一个写者可以并行；同方向的并发调用需调用方自行串行化。
"#]

mod addr;
mod connection;
mod deadline;
mod descriptor;
mod dialer;
pub mod error;
mod guard;
mod socket;

pub use addr::{
    VMADDR_CID_ANY, VMADDR_CID_HOST, VMADDR_CID_HYPERVISOR, VMADDR_CID_LOCAL, VMADDR_PORT_ANY,
    VsockAddr,
};
pub use connection::VsockConnection;
pub use deadline::Deadline;
pub use descriptor::{DescriptorProvider, ShutdownDirection, StreamDescriptor};
pub use dialer::{VsockDialer, dial_stream, dial_stream_with_config};
pub use error::{ErrorCategory, OperationKind, VsockError};
pub use socket::{SystemSockets, VsockSocket, VsockSocketConfig};
