//! GPU parameter blocks.
//!
//! Each block is declared once with [`define_uniform_struct!`], which emits
//! the `#[repr(C)]` Rust struct and the matching WGSL `struct` text so the
//! two sides cannot drift. Fields whose name starts with `__` are host-side
//! padding and are left out of the WGSL declaration.

use std::borrow::Cow;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

// ============================================================================
// Rust type -> WGSL type name
// ============================================================================

pub trait WgslType {
    fn wgsl_type_name() -> Cow<'static, str>;

    fn collect_wgsl_defs(_defs: &mut Vec<String>, _inserted: &mut HashSet<String>) {}
}

impl WgslType for f32 { fn wgsl_type_name() -> Cow<'static, str> { "f32".into() } }
impl WgslType for i32 { fn wgsl_type_name() -> Cow<'static, str> { "i32".into() } }
impl WgslType for u32 { fn wgsl_type_name() -> Cow<'static, str> { "u32".into() } }
impl WgslType for Vec3 { fn wgsl_type_name() -> Cow<'static, str> { "vec3<f32>".into() } }
impl WgslType for Vec4 { fn wgsl_type_name() -> Cow<'static, str> { "vec4<f32>".into() } }
impl WgslType for Mat4 { fn wgsl_type_name() -> Cow<'static, str> { "mat4x4<f32>".into() } }

/// Fixed-size array usable as a uniform field.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformArray<T: Pod, const N: usize>(pub [T; N]);

unsafe impl<T: Pod, const N: usize> Zeroable for UniformArray<T, N> {}
unsafe impl<T: Pod, const N: usize> Pod for UniformArray<T, N> {}

impl<T: WgslType + Pod, const N: usize> WgslType for UniformArray<T, N> {
    fn wgsl_type_name() -> Cow<'static, str> {
        format!("array<{}, {}>", T::wgsl_type_name(), N).into()
    }

    fn collect_wgsl_defs(defs: &mut Vec<String>, inserted: &mut HashSet<String>) {
        T::collect_wgsl_defs(defs, inserted);
    }
}

impl<T: Pod, const N: usize> Default for UniformArray<T, N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<T: Pod, const N: usize> Deref for UniformArray<T, N> {
    type Target = [T; N];
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<T: Pod, const N: usize> DerefMut for UniformArray<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.0 }
}

impl<T: Pod, const N: usize> From<[T; N]> for UniformArray<T, N> {
    fn from(arr: [T; N]) -> Self {
        Self(arr)
    }
}

pub trait WgslStruct: Pod + Zeroable {
    /// WGSL declaration of this block (and any nested structs) under `struct_name`.
    fn wgsl_struct_def(struct_name: &str) -> String;
}

// ============================================================================
// Declaration macro
// ============================================================================

macro_rules! define_uniform_struct {
    (
        $(#[$meta:meta])* struct $name:ident {
            $(
                $vis:vis $field_name:ident : $field_type:ty $(= $default_val:expr)?
            ),* $(,)?
        }
    ) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        $(#[$meta])*
        pub struct $name {
            $( $vis $field_name : $field_type, )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field_name: define_uniform_struct!(@val_or_default $field_type $(, $default_val)?), )*
                }
            }
        }

        impl WgslType for $name {
            fn wgsl_type_name() -> Cow<'static, str> {
                stringify!($name).into()
            }

            fn collect_wgsl_defs(defs: &mut Vec<String>, inserted: &mut HashSet<String>) {
                $( <$field_type as WgslType>::collect_wgsl_defs(defs, inserted); )*
                let own = stringify!($name);
                if inserted.insert(own.to_string()) {
                    defs.push(define_uniform_struct!(@gen_body own, { $( $field_name : $field_type ),* }));
                }
            }
        }

        impl WgslStruct for $name {
            fn wgsl_struct_def(struct_name: &str) -> String {
                let mut defs = Vec::new();
                let mut inserted = HashSet::new();
                $( <$field_type as WgslType>::collect_wgsl_defs(&mut defs, &mut inserted); )*
                defs.push(define_uniform_struct!(@gen_body struct_name, { $( $field_name : $field_type ),* }));
                defs.join("\n")
            }
        }
    };

    (@val_or_default $type:ty, $val:expr) => { $val };
    (@val_or_default $type:ty) => { <$type as Default>::default() };

    (@gen_body $name_str:expr, { $( $field_name:ident : $field_type:ty ),* }) => {{
        let mut code = format!("struct {} {{\n", $name_str);
        $(
            if !stringify!($field_name).starts_with("__") {
                code.push_str(&format!(
                    "    {}: {},\n",
                    stringify!($field_name),
                    <$field_type as WgslType>::wgsl_type_name()
                ));
            }
        )*
        code.push_str("};\n");
        code
    }};
}

// ============================================================================
// Blocks
// ============================================================================

/// Upper bound on bones per skinned node.
pub const MAX_BONES: usize = 255;

/// Three `vec4` rows per bone (row-major 4x3).
pub const SKIN_ROWS: usize = MAX_BONES * 3;

define_uniform_struct!(
    /// Per-frame camera block (group 0).
    struct GlobalUniforms {
        pub view: Mat4 = Mat4::IDENTITY,
        pub view_projection: Mat4 = Mat4::IDENTITY,
        pub camera_position: Vec3 = Vec3::ZERO,
        pub scene_time: f32 = 0.0,
    }
);

define_uniform_struct!(
    /// Per-element material block (group 1).
    struct MaterialUniforms {
        pub ambient: Vec4 = Vec4::ONE,
        pub diffuse: Vec4 = Vec4::ONE,
        pub specular: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0),
        pub emission: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0),
        pub shininess: f32 = 1.0,
        pub texture_flags: u32,
        pub(crate) __pad: UniformArray<u32, 2>,
    }
);

define_uniform_struct!(
    /// Per-node bone palette (group 2).
    ///
    /// `joints[3 * b + r]` holds row `r` of bone `b`'s joint matrix. With
    /// `num_joints == 0` entry 0 is the node's own world transform.
    struct SkinUniforms {
        pub num_joints: i32,
        pub(crate) __pad: UniformArray<i32, 3>,
        pub joints: UniformArray<Vec4, SKIN_ROWS>,
    }
);

impl SkinUniforms {
    /// Writes bone `bone`'s matrix as three rows.
    pub fn set_joint(&mut self, bone: usize, matrix: &Mat4) {
        for r in 0..3 {
            self.joints[bone * 3 + r] = matrix.row(r);
        }
    }

    /// Reassembles bone `bone`'s matrix (last row implicit).
    #[must_use]
    pub fn joint(&self, bone: usize) -> Mat4 {
        let rows = &self.joints[bone * 3..bone * 3 + 3];
        Mat4::from_cols_array_2d(&[
            [rows[0].x, rows[1].x, rows[2].x, 0.0],
            [rows[0].y, rows[1].y, rows[2].y, 0.0],
            [rows[0].z, rows[1].z, rows[2].z, 0.0],
            [rows[0].w, rows[1].w, rows[2].w, 1.0],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn block_sizes_match_wgsl_layout() {
        assert_eq!(mem::size_of::<GlobalUniforms>(), 144);
        assert_eq!(mem::size_of::<MaterialUniforms>(), 80);
        assert_eq!(mem::size_of::<SkinUniforms>(), 16 + SKIN_ROWS * 16);
    }

    #[test]
    fn padding_fields_are_hidden_from_wgsl() {
        let def = MaterialUniforms::wgsl_struct_def("Material");
        assert!(def.starts_with("struct Material {"));
        assert!(def.contains("texture_flags: u32"));
        assert!(!def.contains("__pad"));

        let skin = SkinUniforms::wgsl_struct_def("Skin");
        assert!(skin.contains("joints: array<vec4<f32>, 765>"));
    }

    #[test]
    fn joint_rows_round_trip() {
        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 0.0, //
            4.0, 5.0, 6.0, 0.0, //
            7.0, 8.0, 9.0, 0.0, //
            10.0, 11.0, 12.0, 1.0,
        ]);
        let mut skin = SkinUniforms::default();
        skin.set_joint(4, &m);
        assert_eq!(skin.joint(4), m);
        assert_eq!(skin.joints[12], Vec4::new(1.0, 4.0, 7.0, 10.0));
    }
}
