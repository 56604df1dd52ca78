//! # Skip
//!
//! Schema-free consumption of one value, driven only by wire tags. Used for
//! unknown field ids and for fields whose wire tag disagrees with the
//! schema. Nested structs and containers are walked recursively through the
//! same recursion guard as the main reader, without materialising anything.

use futures::future::{BoxFuture, FutureExt};

use crate::core::guard::RecursionGuard;
use crate::core::types::TypeTag;
use crate::error::{constants, CodecError, Result};
use crate::protocol::port::ProtocolReader;

/// Consume one value of wire shape `tag`.
pub fn skip<'a, R>(port: &'a mut R, tag: TypeTag, guard: &'a RecursionGuard) -> BoxFuture<'a, Result<()>>
where
    R: ProtocolReader + ?Sized,
{
    async move {
        match tag {
            TypeTag::Stop => return Err(CodecError::protocol(constants::ERR_STOP_AS_VALUE)),
            TypeTag::Bool => {
                port.read_bool().await?;
            }
            TypeTag::I8 => {
                port.read_i8().await?;
            }
            TypeTag::I16 => {
                port.read_i16().await?;
            }
            TypeTag::I32 => {
                port.read_i32().await?;
            }
            TypeTag::I64 => {
                port.read_i64().await?;
            }
            TypeTag::Float => {
                port.read_float().await?;
            }
            TypeTag::Double => {
                port.read_double().await?;
            }
            TypeTag::String => {
                port.read_string().await?;
            }
            TypeTag::Binary => {
                port.read_binary().await?;
            }
            TypeTag::Struct => {
                let _level = guard.enter()?;
                port.read_struct_begin().await?;
                loop {
                    let header = port.read_field_begin().await?;
                    if header.is_stop() {
                        break;
                    }
                    skip(&mut *port, header.tag, guard).await?;
                    port.read_field_end().await?;
                }
                port.read_struct_end().await?;
            }
            TypeTag::List => {
                let _level = guard.enter()?;
                let header = port.read_list_begin().await?;
                for _ in 0..header.count {
                    skip(&mut *port, header.element, guard).await?;
                }
                port.read_list_end().await?;
            }
            TypeTag::Set => {
                let _level = guard.enter()?;
                let header = port.read_set_begin().await?;
                for _ in 0..header.count {
                    skip(&mut *port, header.element, guard).await?;
                }
                port.read_set_end().await?;
            }
            TypeTag::Map => {
                let _level = guard.enter()?;
                let header = port.read_map_begin().await?;
                for _ in 0..header.count {
                    skip(&mut *port, header.key, guard).await?;
                    skip(&mut *port, header.value, guard).await?;
                }
                port.read_map_end().await?;
            }
        }
        Ok(())
    }
    .boxed()
}
