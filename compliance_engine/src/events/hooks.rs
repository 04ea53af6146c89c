use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DebtCollectedEvent,
    DepositRequiredEvent,
    DisputeResolvedEvent,
    EligibilityChangedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderCompletedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub deposit_required_producer: Vec<EventProducer<DepositRequiredEvent>>,
    pub eligibility_changed_producer: Vec<EventProducer<EligibilityChangedEvent>>,
    pub debt_collected_producer: Vec<EventProducer<DebtCollectedEvent>>,
    pub dispute_resolved_producer: Vec<EventProducer<DisputeResolvedEvent>>,
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
}

pub struct EventHandlers {
    pub on_deposit_required: Option<EventHandler<DepositRequiredEvent>>,
    pub on_eligibility_changed: Option<EventHandler<EligibilityChangedEvent>>,
    pub on_debt_collected: Option<EventHandler<DebtCollectedEvent>>,
    pub on_dispute_resolved: Option<EventHandler<DisputeResolvedEvent>>,
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_deposit_required = hooks.on_deposit_required.map(|f| EventHandler::new(buffer_size, f));
        let on_eligibility_changed = hooks.on_eligibility_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_debt_collected = hooks.on_debt_collected.map(|f| EventHandler::new(buffer_size, f));
        let on_dispute_resolved = hooks.on_dispute_resolved.map(|f| EventHandler::new(buffer_size, f));
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_deposit_required, on_eligibility_changed, on_debt_collected, on_dispute_resolved, on_order_completed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_deposit_required {
            result.deposit_required_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_eligibility_changed {
            result.eligibility_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_debt_collected {
            result.debt_collected_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_dispute_resolved {
            result.dispute_resolved_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_deposit_required {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_eligibility_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_debt_collected {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_dispute_resolved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_deposit_required: Option<Handler<DepositRequiredEvent>>,
    pub on_eligibility_changed: Option<Handler<EligibilityChangedEvent>>,
    pub on_debt_collected: Option<Handler<DebtCollectedEvent>>,
    pub on_dispute_resolved: Option<Handler<DisputeResolvedEvent>>,
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
}

impl EventHooks {
    pub fn on_deposit_required<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DepositRequiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_deposit_required = Some(Arc::new(f));
        self
    }

    pub fn on_eligibility_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EligibilityChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_eligibility_changed = Some(Arc::new(f));
        self
    }

    pub fn on_debt_collected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DebtCollectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_debt_collected = Some(Arc::new(f));
        self
    }

    pub fn on_dispute_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DisputeResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_dispute_resolved = Some(Arc::new(f));
        self
    }

    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }
}
