/// WGSL raymarch program: a pass-through vertex stage for the screen quad
/// and a fragment stage that integrates dust extinction along each view ray.
///
/// Tile `i` packs distance bins `4i..4i+4` in its RGBA channels, each an
/// equirectangular map of `(density / 5)^(1/4)`.
pub const RAYMARCH_SHADER: &str = r#"
struct Frame {
    rotation: mat4x4<f32>,
    origin: vec3<f32>,
    elapsed_ms: f32,
    viewport: vec2<f32>,
    tile_count: u32,
    _pad: u32,
};

struct Params {
    fov_deg: f32,
    tau_max: f32,
    xi: f32,
    n_steps_max: u32,
    n_samples: u32,
    color: i32,
    dm_min: f32,
    dm_max: f32,
    dm_bins: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0)
var<uniform> frame: Frame;
@group(0) @binding(1)
var<uniform> params: Params;

@group(1) @binding(0) var tile_sampler: sampler;
@group(1) @binding(1) var tile0: texture_2d<f32>;
@group(1) @binding(2) var tile1: texture_2d<f32>;
@group(1) @binding(3) var tile2: texture_2d<f32>;
@group(1) @binding(4) var tile3: texture_2d<f32>;
@group(1) @binding(5) var tile4: texture_2d<f32>;
@group(1) @binding(6) var tile5: texture_2d<f32>;
@group(1) @binding(7) var tile6: texture_2d<f32>;
@group(1) @binding(8) var tile7: texture_2d<f32>;
@group(1) @binding(9) var tile8: texture_2d<f32>;
@group(1) @binding(10) var tile9: texture_2d<f32>;
@group(1) @binding(11) var tile10: texture_2d<f32>;
@group(1) @binding(12) var tile11: texture_2d<f32>;
@group(1) @binding(13) var tile12: texture_2d<f32>;
@group(1) @binding(14) var tile13: texture_2d<f32>;
@group(1) @binding(15) var tile14: texture_2d<f32>;
@group(1) @binding(16) var tile15: texture_2d<f32>;

const PI: f32 = 3.14159265358979;
// 5^(1/4): undoes the quarter-power scaling applied when the tiles were packed.
const DENSITY_SCALE: f32 = 1.49534878;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.ndc = position;
    return out;
}

fn tile_texel(i: u32, uv: vec2<f32>) -> vec4<f32> {
    switch i {
        case 0u: { return textureSampleLevel(tile0, tile_sampler, uv, 0.0); }
        case 1u: { return textureSampleLevel(tile1, tile_sampler, uv, 0.0); }
        case 2u: { return textureSampleLevel(tile2, tile_sampler, uv, 0.0); }
        case 3u: { return textureSampleLevel(tile3, tile_sampler, uv, 0.0); }
        case 4u: { return textureSampleLevel(tile4, tile_sampler, uv, 0.0); }
        case 5u: { return textureSampleLevel(tile5, tile_sampler, uv, 0.0); }
        case 6u: { return textureSampleLevel(tile6, tile_sampler, uv, 0.0); }
        case 7u: { return textureSampleLevel(tile7, tile_sampler, uv, 0.0); }
        case 8u: { return textureSampleLevel(tile8, tile_sampler, uv, 0.0); }
        case 9u: { return textureSampleLevel(tile9, tile_sampler, uv, 0.0); }
        case 10u: { return textureSampleLevel(tile10, tile_sampler, uv, 0.0); }
        case 11u: { return textureSampleLevel(tile11, tile_sampler, uv, 0.0); }
        case 12u: { return textureSampleLevel(tile12, tile_sampler, uv, 0.0); }
        case 13u: { return textureSampleLevel(tile13, tile_sampler, uv, 0.0); }
        case 14u: { return textureSampleLevel(tile14, tile_sampler, uv, 0.0); }
        default: { return textureSampleLevel(tile15, tile_sampler, uv, 0.0); }
    }
}

// Extinction density (mag/kpc) at point p, zero outside the distance grid.
fn density(p: vec3<f32>) -> f32 {
    let r = length(p);
    if (r < 1e-4) {
        return 0.0;
    }
    // r is in kpc, so the distance modulus is 5 log10(r) + 10.
    let dm = 5.0 * log2(r * 100.0) / log2(10.0);
    if (dm < params.dm_min || dm > params.dm_max) {
        return 0.0;
    }
    let span = max(params.dm_max - params.dm_min, 1e-6);
    let bin = u32(round((dm - params.dm_min) / span * f32(params.dm_bins - 1u)));
    let tile = bin / 4u;
    if (tile >= frame.tile_count) {
        return 0.0;
    }

    let theta = acos(clamp(p.z / r, -1.0, 1.0));
    var phi = atan2(p.y, p.x);
    if (phi < 0.0) {
        phi = phi + 2.0 * PI;
    }
    let uv = vec2<f32>(phi / (2.0 * PI), theta / PI);
    let v = tile_texel(tile, uv)[bin % 4u] * DENSITY_SCALE;
    return v * v * v * v;
}

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn colormap(x: f32) -> vec3<f32> {
    switch params.color {
        case 1: { return vec3<f32>(1.0 - x); }
        case 2: { return vec3<f32>(x, x * x, x * x * x * x); }
        default: { return vec3<f32>(x); }
    }
}

fn march(dir: vec3<f32>) -> f32 {
    var t = 0.0;
    var tau = 0.0;
    let xi = max(params.xi, 1e-3);
    for (var i = 0u; i < params.n_steps_max; i = i + 1u) {
        let p = frame.origin + dir * t;
        // Steps grow with distance from the origin, where the grid is coarser.
        let ds = max(length(p) / xi, 1e-3);
        tau = tau + density(p) * ds;
        t = t + ds;
        if (tau > params.tau_max) {
            break;
        }
    }
    return tau;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let aspect = frame.viewport.x / max(frame.viewport.y, 1.0);
    let half_fov = tan(radians(params.fov_deg) * 0.5);
    let pixel = 2.0 / max(frame.viewport, vec2<f32>(1.0));
    let samples = max(params.n_samples, 1u);

    var tau_sum = 0.0;
    for (var s = 0u; s < samples; s = s + 1u) {
        var ndc = in.ndc;
        if (samples > 1u) {
            let seed = in.ndc + vec2<f32>(f32(s), frame.elapsed_ms * 0.001);
            ndc = ndc + (vec2<f32>(hash(seed), hash(seed.yx)) - 0.5) * pixel;
        }
        let cam_dir = normalize(vec3<f32>(ndc.x * aspect * half_fov, ndc.y * half_fov, -1.0));
        let dir = (frame.rotation * vec4<f32>(cam_dir, 0.0)).xyz;
        tau_sum = tau_sum + march(dir);
    }

    let tau = tau_sum / f32(samples);
    let x = clamp(tau / max(params.tau_max, 1e-6), 0.0, 1.0);
    return vec4<f32>(colormap(x), 1.0);
}
"#;
