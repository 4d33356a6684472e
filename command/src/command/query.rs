use {
    crate::{
        buffer::state::{check_aligned, check_range, RecordContext},
        encoder::{Encoder, Occlusion},
        error::ValidationError,
        storage::Storage,
    },
    forge_core::{
        BufferId, NativeBuffer, QueryControlFlags, QueryPoolId, QueryPoolInfo, QueryResultFlags,
        QueryType, VisibilityMode,
    },
};

fn check_queries(
    ctx: &RecordContext<'_>,
    pool: QueryPoolId,
    first: u32,
    count: u32,
) -> Result<QueryPoolInfo, ValidationError> {
    let info = ctx.query_pool(pool)?;
    check_range(
        "query",
        u64::from(first),
        u64::from(count),
        u64::from(info.count),
    )?;
    Ok(info)
}

fn results_of(info: &QueryPoolInfo) -> Result<NativeBuffer, ValidationError> {
    info.results
        .ok_or(ValidationError::InvalidArgument("query pool has no results buffer"))
}

#[derive(Debug, Default)]
pub(crate) struct BeginQuery {
    pool: QueryPoolId,
    query: u32,
    results: NativeBuffer,
    precise: bool,
}

impl BeginQuery {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        pool: QueryPoolId,
        query: u32,
        flags: QueryControlFlags,
    ) -> Result<(), ValidationError> {
        let info = check_queries(ctx, pool, query, 1)?;
        if info.kind != QueryType::Occlusion {
            return Err(ValidationError::InvalidArgument("only occlusion queries can be begun"));
        }
        if ctx.state.queries.contains(&(pool, query)) {
            return Err(ValidationError::QueryActive { pool, query });
        }
        if !ctx.state.queries.is_empty() {
            return Err(ValidationError::InvalidArgument("another occlusion query is active"));
        }

        self.pool = pool;
        self.query = query;
        self.results = results_of(&info)?;
        self.precise = flags.contains(QueryControlFlags::PRECISE);
        ctx.state.queries.push((pool, query));
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.begin_occlusion(Occlusion {
            pool: self.pool,
            query: self.query,
            buffer: self.results,
            mode: if self.precise {
                VisibilityMode::Counting
            } else {
                VisibilityMode::Boolean
            },
        });
    }
}

#[derive(Debug, Default)]
pub(crate) struct EndQuery {
    pool: QueryPoolId,
    query: u32,
}

impl EndQuery {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        pool: QueryPoolId,
        query: u32,
    ) -> Result<(), ValidationError> {
        let index = ctx
            .state
            .queries
            .iter()
            .position(|&active| active == (pool, query))
            .ok_or(ValidationError::QueryNotActive { pool, query })?;
        ctx.state.queries.remove(index);

        self.pool = pool;
        self.query = query;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.end_occlusion(self.pool, self.query);
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResetQueryPool {
    pool: QueryPoolId,
    results: Option<NativeBuffer>,
    first: u32,
    count: u32,
}

impl ResetQueryPool {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        pool: QueryPoolId,
        first: u32,
        count: u32,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("reset query pool")?;
        let info = check_queries(ctx, pool, first, count)?;

        self.pool = pool;
        self.results = info.results;
        self.first = first;
        self.count = count;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.reset_queries(self.pool, self.results, self.first, self.count);
    }
}

#[derive(Debug, Default)]
pub(crate) struct WriteTimestamp {
    pool: QueryPoolId,
    query: u32,
}

impl WriteTimestamp {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        pool: QueryPoolId,
        query: u32,
    ) -> Result<(), ValidationError> {
        let info = check_queries(ctx, pool, query, 1)?;
        if info.kind != QueryType::Timestamp {
            return Err(ValidationError::InvalidArgument("query pool does not hold timestamps"));
        }

        self.pool = pool;
        self.query = query;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.write_timestamp(self.pool, self.query);
    }
}

#[derive(Debug, Default)]
pub(crate) struct CopyQueryPoolResults {
    results: NativeBuffer,
    first: u32,
    count: u32,
    dst: NativeBuffer,
    dst_offset: u64,
    stride: u64,
    flags: QueryResultFlags,
}

impl CopyQueryPoolResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        pool: QueryPoolId,
        first: u32,
        count: u32,
        dst: BufferId,
        dst_offset: u64,
        stride: u64,
        flags: QueryResultFlags,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("copy query pool results")?;
        let info = check_queries(ctx, pool, first, count)?;
        let buffer = ctx.buffer(dst)?;

        let element = if flags.contains(QueryResultFlags::RESULT_64) {
            8
        } else {
            4
        };
        let entry = if flags.contains(QueryResultFlags::WITH_AVAILABILITY) {
            element * 2
        } else {
            element
        };
        check_aligned("query results offset", dst_offset, element)?;
        check_aligned("query results stride", stride, element)?;
        if count > 1 && stride < entry {
            return Err(ValidationError::InvalidArgument("query results overlap"));
        }
        if count > 0 {
            let size = stride * u64::from(count - 1) + entry;
            check_range("query results", dst_offset, size, buffer.size)?;
        }

        self.results = results_of(&info)?;
        self.first = first;
        self.count = count;
        self.dst = buffer.native;
        self.dst_offset = dst_offset;
        self.stride = stride;
        self.flags = flags;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        if self.count == 0 {
            return;
        }
        // Results are converted by a compute kernel.
        encoder.compute_encoder();
        encoder.native.copy_query_results(
            self.results,
            self.first,
            self.count,
            self.dst,
            self.dst_offset,
            self.stride,
            self.flags,
        );
    }
}
