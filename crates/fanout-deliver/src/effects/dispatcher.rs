use tracing::{debug, error, warn};

use crate::core::{caption_for, failure_wait, throttle_wait};
use crate::data::{ChatId, Delivery, DeliveryOptions, DeliveryReference, Media, MessageId};
use crate::effects::agent::{AgentPool, Pacer};
use crate::effects::channel::Channel;
use crate::error::{ChannelError, DeliveryError};

/// Delivers streamed items to recipients in two stages.
///
/// 1. Mirror: when a mirror sink is configured, upload the item through a
///    secondary agent to obtain a reusable reference. Failure here is never
///    fatal.
/// 2. Forward: send to the recipient through the primary channel, by
///    reference when stage 1 produced one.
///
/// Safe to share across concurrent deliveries; all mutable state is per
/// agent.
pub struct Dispatcher<C: Channel> {
    primary: C,
    primary_pacer: Pacer,
    agents: AgentPool<C>,
    mirror: Option<ChatId>,
    options: DeliveryOptions,
}

impl<C: Channel> Dispatcher<C> {
    pub fn new(primary: C, agents: AgentPool<C>, mirror: Option<ChatId>, options: DeliveryOptions) -> Self {
        Self {
            primary,
            primary_pacer: Pacer::new(options.send_interval),
            agents,
            mirror,
            options,
        }
    }

    pub fn primary(&self) -> &C {
        &self.primary
    }

    pub fn agents(&self) -> &AgentPool<C> {
        &self.agents
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    /// Deliver one item to `recipient`.
    ///
    /// Empty and oversized items are skipped and count as delivered.
    pub async fn deliver(&self, recipient: ChatId, item: &Delivery) -> Result<(), DeliveryError> {
        if item.payload.is_empty() {
            debug!(source_id = %item.source_id, "empty image data, skipping");
            return Ok(());
        }
        if item.payload.len() > self.options.max_item_bytes {
            debug!(
                source_id = %item.source_id,
                size = item.payload.len(),
                limit = self.options.max_item_bytes,
                "image exceeds size limit, skipping"
            );
            return Ok(());
        }

        let reference = match self.mirror {
            Some(mirror) => self.mirror_upload(mirror, item).await,
            None => None,
        };

        self.forward(recipient, item, reference).await
    }

    /// Send plain text to `recipient` through the primary channel.
    pub async fn notify(&self, recipient: ChatId, text: &str) -> Result<Option<MessageId>, ChannelError> {
        self.primary_pacer.wait().await;
        self.primary.send_text(recipient, text).await.inspect_err(|err| {
            error!(chat_id = %recipient, %err, "failed to send text");
        })
    }

    /// Rewrite a message sent earlier with [`notify`](Self::notify).
    pub async fn edit_notice(&self, recipient: ChatId, message: MessageId, text: &str) -> Result<(), ChannelError> {
        self.primary_pacer.wait().await;
        self.primary
            .edit_text(recipient, message, text)
            .await
            .inspect_err(|err| warn!(chat_id = %recipient, %message, %err, "failed to edit message"))
    }

    pub async fn delete_notice(&self, recipient: ChatId, message: MessageId) -> Result<(), ChannelError> {
        self.primary_pacer.wait().await;
        self.primary
            .delete_message(recipient, message)
            .await
            .inspect_err(|err| warn!(chat_id = %recipient, %message, %err, "failed to delete message"))
    }

    async fn mirror_upload(&self, mirror: ChatId, item: &Delivery) -> Option<DeliveryReference> {
        let attempts = self.options.attempts.max(1);

        for attempt in 0..attempts {
            let agent = self.agents.next();
            let channel = match agent {
                Some(agent) => {
                    agent.pacer().wait().await;
                    agent.channel()
                }
                None => {
                    self.primary_pacer.wait().await;
                    &self.primary
                }
            };
            let agent_id = agent.map(|a| a.id());

            match channel
                .send_media(mirror, Media::Upload(item.payload.clone()), None)
                .await
            {
                Ok(reference) => {
                    if let Some(agent) = agent {
                        agent.record_success();
                    }
                    debug!(
                        source_id = %item.source_id,
                        index = item.index,
                        agent = ?agent_id,
                        reference = ?reference,
                        "uploaded to mirror"
                    );
                    return reference;
                }
                Err(err) => {
                    let failures = agent.map(|a| a.record_failure());
                    let last = attempt + 1 == attempts;

                    match err {
                        ChannelError::Throttled { retry_after, .. } => {
                            let wait = throttle_wait(retry_after, attempt, self.options.throttle_step);
                            debug!(
                                retry = attempt + 1,
                                agent = ?agent_id,
                                failures = ?failures,
                                wait_time = ?wait,
                                "throttled on mirror, switching agent"
                            );
                            if !last {
                                tokio::time::sleep(wait).await;
                            }
                        }
                        ChannelError::Transient(reason) => {
                            error!(retry = attempt + 1, agent = ?agent_id, %reason, "failed to upload to mirror");
                            if !last {
                                tokio::time::sleep(failure_wait(attempt, self.options.failure_step)).await;
                            }
                        }
                    }
                }
            }
        }

        warn!(source_id = %item.source_id, attempts, "mirror upload abandoned, uploading directly");
        None
    }

    async fn forward(
        &self,
        recipient: ChatId,
        item: &Delivery,
        mut reference: Option<DeliveryReference>,
    ) -> Result<(), DeliveryError> {
        let attempts = self.options.attempts.max(1);
        let caption = caption_for(item.index, item.total, self.options.caption_every);

        for attempt in 0..attempts {
            self.primary_pacer.wait().await;

            let media = match &reference {
                Some(reference) => Media::Reference(reference.clone()),
                None => Media::Upload(item.payload.clone()),
            };
            let by_reference = !media.is_upload();

            match self.primary.send_media(recipient, media, caption.clone()).await {
                Ok(_) => {
                    debug!(
                        chat_id = %recipient,
                        source_id = %item.source_id,
                        index = item.index,
                        by_reference,
                        "sent to recipient"
                    );
                    return Ok(());
                }
                Err(ChannelError::Throttled {
                    retry_after,
                    reference: partial,
                }) => {
                    let wait = throttle_wait(retry_after, attempt, self.options.throttle_step);
                    warn!(retry = attempt + 1, wait_time = ?wait, chat_id = %recipient, "throttled on recipient send");
                    if reference.is_none() {
                        reference = partial;
                    }
                    if attempt + 1 < attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(ChannelError::Transient(reason)) => {
                    error!(retry = attempt + 1, chat_id = %recipient, %reason, "failed to send to recipient");
                    if attempt + 1 < attempts {
                        tokio::time::sleep(failure_wait(attempt, self.options.failure_step)).await;
                    }
                }
            }
        }

        Err(DeliveryError::Exhausted { attempts })
    }
}
