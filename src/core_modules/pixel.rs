// THEORY (Pixel and Color Transform):
// The `Pixel` module is the most fundamental unit of the fingerprinting system. It
// is a "dumb" data container for a single 8-bit RGBA pixel plus the one transform
// every later stage depends on: RGB to luma/chroma (YCbCr-style, Rec. 601 weights).
//
// What lives here:
// - Raw channels (RGBA) as read from a raster.
// - Alpha premultiplication, matching how a 16-bit premultiplying decoder reduces
//   a straight-alpha pixel to 8 bits. Opaque pixels pass through untouched.
// - `ycbcr`: the color transform, computed in f32. It is applied to block means,
//   never to truncated integers, so rounding error does not compound through the
//   downsampling stages.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors.
// 2) Pure and total: every input has an output, no failure modes.

pub mod pixel {
    pub type Channel = u8;
    pub type ComputedChannel = f32;
    pub type Luma = f32;
    pub type ChromaBlue = f32;
    pub type ChromaRed = f32;

    const CHANNELS: usize = 4;

    // Rec. 601 luma weights.
    const LUMA_FROM_R: f32 = 0.299;
    const LUMA_FROM_G: f32 = 0.587;
    const LUMA_FROM_B: f32 = 0.114;

    const CHROMA_OFFSET: f32 = 128.0;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, Channel::MAX)
        }

        /// Colors scaled by alpha, then alpha dropped.
        ///
        /// Each channel is widened to 16 bits (`c * 257`), multiplied by alpha,
        /// divided by 255 and shifted back down to 8 bits.
        pub fn premultiplied(&self) -> [Channel; 3] {
            if self.alpha == Channel::MAX {
                return [self.red, self.green, self.blue];
            }
            let alpha = self.alpha as u32;
            let scale = |c: Channel| -> Channel { (((c as u32 * 257 * alpha) / 255) >> 8) as Channel };
            [scale(self.red), scale(self.green), scale(self.blue)]
        }
    }

    impl From<&[u8]> for Pixel {
        /// Reads one pixel from an RGBA byte slice. Missing trailing channels
        /// default to opaque black.
        fn from(bytes: &[u8]) -> Self {
            let mut channels = [0, 0, 0, Channel::MAX];
            for (slot, byte) in channels.iter_mut().zip(bytes.iter().take(CHANNELS)) {
                *slot = *byte;
            }
            Pixel::new(channels[0], channels[1], channels[2], channels[3])
        }
    }

    /// Transforms RGB components (0.0-255.0) to luma, chroma-blue and chroma-red.
    pub fn ycbcr(
        r: ComputedChannel,
        g: ComputedChannel,
        b: ComputedChannel,
    ) -> (Luma, ChromaBlue, ChromaRed) {
        let luma = LUMA_FROM_R * r + LUMA_FROM_G * g + LUMA_FROM_B * b;
        let chroma_blue = CHROMA_OFFSET - 0.168736 * r - 0.331264 * g + 0.5 * b;
        let chroma_red = CHROMA_OFFSET + 0.5 * r - 0.418688 * g - 0.081312 * b;
        (luma, chroma_blue, chroma_red)
    }
}
