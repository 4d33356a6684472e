use {
    super::Encoder,
    forge_core::{
        Device, EncoderKind, EventId, NativeBuffer, NativeEvent, QueryPoolId, VisibilityMode,
    },
    forge_memory::Reuse,
    smallvec::SmallVec,
};

/// Bytes of one occlusion result in the results buffer.
const RESULT_SIZE: u64 = 8;

/// Host-visible effect of executed commands, applied by the completion handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeferredSignal {
    QueriesAvailable {
        pool: QueryPoolId,
        first: u32,
        count: u32,
    },
    QueriesReset {
        pool: QueryPoolId,
        first: u32,
        count: u32,
    },
    Timestamp {
        pool: QueryPoolId,
        query: u32,
    },
    EventStatus {
        event: EventId,
        signaled: bool,
    },
}

impl DeferredSignal {
    pub(crate) fn apply(&self, device: &dyn Device) {
        match *self {
            DeferredSignal::QueriesAvailable { pool, first, count } => {
                let queries: SmallVec<[u32; 8]> = (first..first + count).collect();
                device.mark_queries_available(pool, &queries);
            }
            DeferredSignal::QueriesReset { pool, first, count } => {
                device.reset_queries(pool, first, count)
            }
            DeferredSignal::Timestamp { pool, query } => {
                device.write_timestamp(pool, query);
                device.mark_queries_available(pool, &[query]);
            }
            DeferredSignal::EventStatus { event, signaled } => {
                device.set_event_status(event, signaled)
            }
        }
    }
}

/// Signals of one submission, recycled between submissions.
#[derive(Debug, Default)]
pub(crate) struct SignalList(pub(crate) Vec<DeferredSignal>);

impl Reuse for SignalList {
    fn reuse(&mut self) {
        self.0.clear();
    }
}

/// Occlusion query counted by the render encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Occlusion {
    pub pool: QueryPoolId,
    pub query: u32,
    pub buffer: NativeBuffer,
    pub mode: VisibilityMode,
}

#[derive(Debug, Default)]
pub(crate) struct QueryState {
    active: Option<Occlusion>,
    /// Visibility buffer of the open render encoder.
    pub(crate) visibility: Option<NativeBuffer>,
}

impl QueryState {
    /// Visibility buffer the next render encoder should count into.
    pub(crate) fn visibility_buffer(&self) -> Option<NativeBuffer> {
        self.active.map(|occlusion| occlusion.buffer).or(self.visibility)
    }
}

impl<'a> Encoder<'a> {
    fn visibility_offset(&self, query: u32) -> u64 {
        // Views rendered by separate native passes count into consecutive queries.
        let view = self.pass.as_ref().map_or(0, |pass| {
            if pass.layered_views > 1 {
                0
            } else {
                pass.multiview_pass
            }
        });
        u64::from(query + view) * RESULT_SIZE
    }

    /// Continue counting in a freshly opened render encoder.
    pub(super) fn resume_occlusion(&mut self) {
        if let Some(active) = self.queries.active {
            let offset = self.visibility_offset(active.query);
            self.native.set_visibility_result_mode(active.mode, offset);
        }
    }

    pub(crate) fn begin_occlusion(&mut self, occlusion: Occlusion) {
        self.queries.active = Some(occlusion);
        if self.kind() != Some(EncoderKind::Render) {
            return;
        }

        if self.queries.visibility != Some(occlusion.buffer) {
            // Visibility buffer is fixed for the lifetime of a render encoder.
            self.end_current_encoding();
            self.graphics_encoder();
            self.fallback("render encoder restart for another visibility buffer");
        } else {
            self.resume_occlusion();
        }
    }

    pub(crate) fn end_occlusion(&mut self, pool: QueryPoolId, query: u32) {
        match self.queries.active {
            Some(active) if active.pool == pool && active.query == query => {
                self.queries.active = None;
                if self.kind() == Some(EncoderKind::Render) {
                    let offset = self.visibility_offset(query);
                    self.native
                        .set_visibility_result_mode(VisibilityMode::Disabled, offset);
                }
            }
            _ => log::warn!("Query {} of {:?} is not active", query, pool),
        }

        if self.first_replay() {
            let count = self.pass.as_ref().map_or(1, |pass| pass.view_count());
            self.defer(DeferredSignal::QueriesAvailable {
                pool,
                first: query,
                count,
            });
        }
    }

    /// Zero results and mark queries unavailable once executed.
    pub(crate) fn reset_queries(
        &mut self,
        pool: QueryPoolId,
        results: Option<NativeBuffer>,
        first: u32,
        count: u32,
    ) {
        if let Some(buffer) = results {
            self.blit_encoder();
            self.native.fill_buffer(
                buffer,
                u64::from(first) * RESULT_SIZE,
                u64::from(count) * RESULT_SIZE,
                0,
            );
        }
        self.defer(DeferredSignal::QueriesReset { pool, first, count });
    }

    pub(crate) fn write_timestamp(&mut self, pool: QueryPoolId, query: u32) {
        if self.first_replay() {
            self.defer(DeferredSignal::Timestamp { pool, query });
        }
    }

    fn native_event(&self, native: Option<NativeEvent>) -> Option<NativeEvent> {
        if self.config.native_events && self.device.limits().native_events {
            native
        } else {
            None
        }
    }

    /// Set or reset event once preceding work completes.
    pub(crate) fn signal_event(
        &mut self,
        event: EventId,
        native: Option<NativeEvent>,
        signaled: bool,
    ) {
        match self.native_event(native) {
            Some(native) => {
                self.end_current_encoding();
                self.native.signal_event(native, if signaled { 1 } else { 0 });
            }
            None => self.defer(DeferredSignal::EventStatus { event, signaled }),
        }
    }

    /// Wait for event before following work starts.
    /// Returns `false` if the wait can't be expressed natively.
    pub(crate) fn wait_event(&mut self, native: Option<NativeEvent>) -> bool {
        match self.native_event(native) {
            Some(native) => {
                self.end_current_encoding();
                self.native.wait_event(native, 1);
                true
            }
            None => {
                self.fallback("event wait ordered by barrier only");
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        forge_core::{
            empty::{Call, DeviceSignal, EmptyDevice, Recorder},
            QueryType,
        },
    };

    #[test]
    fn signals_reach_device() {
        let mut device = EmptyDevice::default();
        let pool = device.create_query_pool(QueryType::Timestamp, 4);
        let event = device.create_event(false);

        DeferredSignal::QueriesAvailable {
            pool,
            first: 1,
            count: 2,
        }
        .apply(&device);
        DeferredSignal::EventStatus {
            event,
            signaled: true,
        }
        .apply(&device);

        assert_eq!(
            device.signals(),
            vec![
                DeviceSignal::QueriesAvailable {
                    pool,
                    queries: vec![1, 2],
                },
                DeviceSignal::EventStatus {
                    event,
                    signaled: true,
                },
            ]
        );
    }

    #[test]
    fn native_event_is_signaled_outside_encoders() {
        let mut device = EmptyDevice::default();
        let event = device.create_event(true);
        let native = device.event(event).and_then(|info| info.native);
        let mut recorder = Recorder::new();
        let signals = {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.blit_encoder();
            encoder.signal_event(event, native, true);
            assert!(encoder.wait_event(native));
            encoder.finish().1
        };

        assert!(signals.is_empty());
        assert!(recorder.calls.contains(&Call::SignalEvent(NativeEvent(event.raw()), 1)));
        assert_eq!(recorder.calls.last(), Some(&Call::WaitEvent(NativeEvent(event.raw()), 1)));
    }

    #[test]
    fn emulated_event_is_deferred() {
        let mut device = EmptyDevice::default();
        let event = device.create_event(false);
        let mut recorder = Recorder::new();
        let (stats, signals) = {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.signal_event(event, None, false);
            assert!(!encoder.wait_event(None));
            encoder.finish()
        };

        assert_eq!(
            signals,
            vec![DeferredSignal::EventStatus {
                event,
                signaled: false,
            }]
        );
        assert_eq!(stats.fallbacks, 1);
        assert!(recorder.calls.is_empty());
    }
}
