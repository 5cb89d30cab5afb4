//! Lua scripts for atomic Redis writes.
//!
//! Redis runs each script atomically, so the read-compare-write of the
//! counter record cannot interleave with another instance's write.

/// Compare-and-swap on the counter record.
///
/// Arguments:
/// - KEYS[1]: Counter key (`clicks`), JSON `{"count": <n>}`
/// - ARGV[1]: Expected count
/// - ARGV[2]: New count
///
/// Returns:
/// - 1: Swapped
/// - 0: Current count differs from expected (lost race)
/// - -1: Error (non-numeric argument or undecodable record)
pub const COMPARE_AND_SWAP_COUNT: &str = r#"
local expected = tonumber(ARGV[1])
local new_count = tonumber(ARGV[2])

if expected == nil or new_count == nil then
    return -1
end

local current_count = 0
local raw = redis.call('GET', KEYS[1])

if raw ~= nil and raw ~= false then
    local ok, record = pcall(cjson.decode, raw)
    if not ok or type(record) ~= 'table' then
        return -1
    end
    current_count = tonumber(record['count'])
    if current_count == nil then
        return -1
    end
end

if current_count ~= expected then
    return 0
end

-- ARGV[2] is written verbatim to avoid float formatting of large counts
redis.call('SET', KEYS[1], '{"count":' .. ARGV[2] .. '}')
return 1
"#;
