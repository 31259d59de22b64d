//! [`Connector`] implementation backed by `lapin`.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use super::{BrokerSession, Connector, EventSink, OutgoingMessage, SessionEvent};
use crate::error::BoxError;

const REPLY_SUCCESS: u16 = 200;
const DELIVERY_MODE_TRANSIENT: u8 = 1;
const DELIVERY_MODE_PERSISTENT: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct LapinConnector;

#[async_trait]
impl Connector for LapinConnector {
    async fn connect(
        &self,
        url: &str,
        events: EventSink,
    ) -> Result<Box<dyn BrokerSession>, BoxError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        // lapin reports a broker or network initiated close through the
        // error hook as an invalid connection state.
        connection.on_error(move |err| {
            let event = match err {
                lapin::Error::InvalidConnectionState(_) => SessionEvent::Closed,
                other => SessionEvent::Error(other.to_string()),
            };
            events.notify(event);
        });

        Ok(Box::new(LapinSession {
            connection,
            channel,
        }))
    }
}

struct LapinSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerSession for LapinSession {
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<(), BoxError> {
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn publish(&self, message: OutgoingMessage<'_>) -> Result<(), BoxError> {
        let delivery_mode = if message.persistent {
            DELIVERY_MODE_PERSISTENT
        } else {
            DELIVERY_MODE_TRANSIENT
        };
        let properties = BasicProperties::default()
            .with_message_id(message.message_id.to_string().into())
            .with_content_type(message.content_type.into())
            .with_timestamp(message.timestamp)
            .with_delivery_mode(delivery_mode);

        // No publisher confirms: the returned confirm resolves immediately.
        self.channel
            .basic_publish(
                message.exchange,
                message.routing_key,
                BasicPublishOptions::default(),
                message.payload,
                properties,
            )
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        let channel = self.channel.close(REPLY_SUCCESS, "bridge shutting down").await;
        let connection = self
            .connection
            .close(REPLY_SUCCESS, "bridge shutting down")
            .await;
        channel?;
        connection?;
        Ok(())
    }
}
